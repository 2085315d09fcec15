//! Call classification.
//!
//! The Kotlin compiler lowers many source constructs into shapes that do not
//! resemble them in bytecode. The classifier undoes that lowering using naming
//! conventions and the class metadata the provider exposes, and assigns each
//! call exactly one [`ConstructKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smartstep_bytecode::{
    ClassInfo, InvokeKind, MetadataProvider, MethodDescriptor, MethodInfo, MethodRef,
};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::names::{self, AccessorKind, AccessorShape};
use crate::scanner::Instruction;

/// Maximum superclass hops when looking for a property's backing field.
const MAX_SUPER_DEPTH: usize = 16;

/// Root of every class loader hierarchy.
pub const CLASS_LOADER: &str = "java/lang/ClassLoader";

/// Source construct a call instruction was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstructKind {
    /// Ordinary virtual, interface or Java static call.
    Member,
    /// Extension function; the receiver is passed as the first argument.
    Extension,
    /// Top-level function hoisted into a file facade.
    TopLevel,
    /// Property read compiled to a getter.
    PropertyGetter,
    /// Property write compiled to a setter.
    PropertySetter,
    /// Member of a companion object.
    CompanionMember,
    /// Member of a singleton `object`.
    ObjectMember,
    /// Constructor invocation.
    Constructor,
    /// Bridge, default-argument dispatcher, lambda body or accessor for a
    /// private member.
    Synthetic,
    /// Nothing applied, usually because metadata was unavailable.
    Unknown,
}

impl ConstructKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Member,
        Self::Extension,
        Self::TopLevel,
        Self::PropertyGetter,
        Self::PropertySetter,
        Self::CompanionMember,
        Self::ObjectMember,
        Self::Constructor,
        Self::Synthetic,
        Self::Unknown,
    ];

    /// Stable name used in configuration files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Extension => "Extension",
            Self::TopLevel => "TopLevel",
            Self::PropertyGetter => "PropertyGetter",
            Self::PropertySetter => "PropertySetter",
            Self::CompanionMember => "CompanionMember",
            Self::ObjectMember => "ObjectMember",
            Self::Constructor => "Constructor",
            Self::Synthetic => "Synthetic",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConstructKind {
    type Err = SmolStr;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(text))
            .ok_or_else(|| SmolStr::new(text))
    }
}

/// A classified call instruction.
///
/// Fields are fixed at classification; later stages only read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallCandidate {
    instruction: Instruction,
    kind: ConstructKind,
    logical_owner: SmolStr,
    display_owner: SmolStr,
    member: SmolStr,
    receiver: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_file: Option<SmolStr>,
    class_loader: bool,
    sequence: usize,
    label: SmolStr,
}

impl CallCandidate {
    /// Instruction this candidate was classified from.
    #[must_use]
    pub fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    /// Source construct.
    #[must_use]
    pub fn kind(&self) -> ConstructKind {
        self.kind
    }

    /// User-visible declaring scope: a class (`com.example.A`) or, for
    /// top-level declarations, a package (`com.example`).
    #[must_use]
    pub fn logical_owner(&self) -> &str {
        &self.logical_owner
    }

    /// User-visible member name; the property name for accessors.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Simple name of an extension's receiver type.
    #[must_use]
    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref()
    }

    /// Kotlin file declaring a top-level function or extension
    /// (`Main.kt`), when it can be told from metadata or the facade name.
    #[must_use]
    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    /// Whether the call is compiled against `java.lang.ClassLoader` or a
    /// subclass of it.
    #[must_use]
    pub fn is_class_loader(&self) -> bool {
        self.class_loader
    }

    /// Position among the calls of the scanned range.
    #[must_use]
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Human readable label such as `A.member(int)` or `String.extFun()`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Source line of the instruction.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.instruction.line
    }

    /// Bytecode offset of the instruction.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.instruction.offset
    }

    /// Source column, when the method carries a column table.
    #[must_use]
    pub fn column(&self) -> Option<u32> {
        self.instruction.column
    }

    /// Invoked method; `None` when the constant pool entry did not resolve.
    #[must_use]
    pub fn target(&self) -> Option<&MethodRef> {
        self.instruction.target.as_ref()
    }

    /// Binary name of the class the call is compiled against
    /// (`kotlin.collections.CollectionsKt`), empty when unresolved.
    #[must_use]
    pub fn declaring_class(&self) -> String {
        self.instruction
            .owner()
            .map(names::binary_name)
            .unwrap_or_default()
    }

    /// Identity of the logical call: owner, method, descriptor and offset.
    #[must_use]
    pub fn dedup_key(&self) -> (SmolStr, SmolStr, SmolStr, u32) {
        match &self.instruction.target {
            Some(target) => (
                target.owner.clone(),
                target.name.clone(),
                target.descriptor.clone(),
                self.instruction.offset,
            ),
            None => (
                SmolStr::default(),
                SmolStr::new(format!("#{}", self.instruction.pool_index)),
                SmolStr::default(),
                self.instruction.offset,
            ),
        }
    }

    /// Whether two candidates invoke the same method, wherever they sit.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        match (self.target(), other.target()) {
            (Some(a), Some(b)) => {
                a.owner == b.owner && a.name == b.name && a.descriptor == b.descriptor
            }
            _ => false,
        }
    }
}

struct Classified {
    kind: ConstructKind,
    logical_owner: String,
    display_owner: String,
    member: String,
    receiver: Option<String>,
    source_file: Option<String>,
    skip_params: usize,
}

impl Classified {
    fn class_scoped(kind: ConstructKind, owner: &str, member: &str) -> Self {
        Self {
            kind,
            logical_owner: names::dotted(owner),
            display_owner: names::simple_class(owner),
            member: member.to_string(),
            receiver: None,
            source_file: None,
            skip_params: 0,
        }
    }

    fn in_file(mut self, source_file: Option<String>) -> Self {
        self.source_file = source_file;
        self
    }

    fn package_scoped(kind: ConstructKind, owner: &str, member: &str) -> Self {
        Self {
            kind,
            logical_owner: names::package_of(owner),
            display_owner: String::new(),
            member: member.to_string(),
            receiver: None,
            source_file: None,
            skip_params: 0,
        }
    }
}

/// Classifies call instructions against provider metadata.
///
/// Stateless between calls: classifying the same instruction twice yields the
/// same candidate.
#[derive(Debug)]
pub struct Classifier<'a, P: MetadataProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: MetadataProvider + ?Sized> Classifier<'a, P> {
    /// Create a classifier over a provider.
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Classify every instruction, numbering them in scan order.
    #[must_use]
    pub fn classify_all(&self, instructions: &[Instruction]) -> Vec<CallCandidate> {
        instructions
            .iter()
            .enumerate()
            .map(|(sequence, insn)| self.classify(insn, sequence))
            .collect()
    }

    /// Classify one instruction.
    #[must_use]
    pub fn classify(&self, instruction: &Instruction, sequence: usize) -> CallCandidate {
        let classified = match &instruction.target {
            Some(target) => self.classify_target(instruction.kind, target),
            None => Classified {
                kind: ConstructKind::Unknown,
                logical_owner: String::new(),
                display_owner: String::new(),
                member: format!("#{}", instruction.pool_index),
                receiver: None,
                source_file: None,
                skip_params: 0,
            },
        };
        let class_loader = instruction
            .target
            .as_ref()
            .is_some_and(|target| self.provider.is_subtype(&target.owner, CLASS_LOADER));
        let params = instruction
            .target
            .as_ref()
            .and_then(|target| MethodDescriptor::parse(&target.descriptor).ok())
            .map(|desc| desc.simple_params(classified.skip_params))
            .unwrap_or_default();
        let label = render_label(&classified, &params);
        trace!(
            offset = instruction.offset,
            kind = %classified.kind,
            %label,
            "classified call"
        );
        CallCandidate {
            instruction: instruction.clone(),
            kind: classified.kind,
            logical_owner: classified.logical_owner.into(),
            display_owner: classified.display_owner.into(),
            member: classified.member.into(),
            receiver: classified.receiver.map(SmolStr::from),
            source_file: classified.source_file.map(SmolStr::from),
            class_loader,
            sequence,
            label: label.into(),
        }
    }

    fn classify_target(&self, invoke: InvokeKind, target: &MethodRef) -> Classified {
        let owner = target.owner.as_str();
        let name = target.name.as_str();
        let info = self.provider.class_info(owner);
        let method = info.and_then(|class| class.method(name, &target.descriptor));

        if target.is_constructor() {
            return Classified::class_scoped(
                ConstructKind::Constructor,
                owner,
                &names::simple_class(owner),
            );
        }

        if is_generated(owner, name, info, method) {
            return Classified::class_scoped(ConstructKind::Synthetic, owner, name);
        }

        if let Some(outer) = names::companion_outer(owner) {
            return Classified::class_scoped(ConstructKind::CompanionMember, outer, name);
        }

        let Some(info) = info else {
            if invoke == InvokeKind::Static && names::is_file_facade_name(owner) {
                return Classified::package_scoped(ConstructKind::TopLevel, owner, name)
                    .in_file(names::facade_source_file(owner));
            }
            debug!(owner, name, "no class metadata, classifying as unknown");
            return Classified::class_scoped(ConstructKind::Unknown, owner, name);
        };
        let facade = info.kind.is_file_facade();
        let source_file = || {
            info.source_file
                .as_deref()
                .map(str::to_string)
                .or_else(|| names::facade_source_file(owner))
        };

        if let Some(receiver) = method.and_then(|method| method.extension_receiver.as_ref()) {
            let mut classified = if facade {
                Classified::package_scoped(ConstructKind::Extension, owner, name)
                    .in_file(source_file())
            } else {
                Classified::class_scoped(ConstructKind::Extension, owner, name)
            };
            classified.receiver = Some(names::simple_class(receiver));
            classified.skip_params = 1;
            return classified;
        }

        if info.is_singleton_object() {
            return Classified::class_scoped(ConstructKind::ObjectMember, owner, name);
        }

        if let Some((shape, kind, declaring)) =
            self.property_accessor(info, name, &target.descriptor)
        {
            let declaring = declaring.name.as_str();
            return if declaring == owner && facade {
                Classified::package_scoped(kind, owner, &shape.property)
            } else {
                Classified::class_scoped(kind, declaring, &shape.property)
            };
        }

        if facade && invoke == InvokeKind::Static {
            return Classified::package_scoped(ConstructKind::TopLevel, owner, name)
                .in_file(source_file());
        }

        Classified::class_scoped(ConstructKind::Member, owner, name)
    }

    /// An accessor-shaped method backed by a field of the matching type,
    /// declared on the owner or one of its superclasses. Also returns the
    /// class declaring the field.
    fn property_accessor(
        &self,
        info: &'a ClassInfo,
        name: &str,
        descriptor: &str,
    ) -> Option<(AccessorShape, ConstructKind, &'a ClassInfo)> {
        let descriptor = MethodDescriptor::parse(descriptor).ok()?;
        let shape = names::accessor_shape(name, &descriptor)?;
        let mut current = Some(info);
        for _ in 0..MAX_SUPER_DEPTH {
            let class = current?;
            let backed = shape.field_names.iter().any(|field| {
                class
                    .field(field)
                    .is_some_and(|field| field.descriptor == shape.value_type)
            });
            if backed {
                let kind = match shape.kind {
                    AccessorKind::Getter => ConstructKind::PropertyGetter,
                    AccessorKind::Setter => ConstructKind::PropertySetter,
                };
                return Some((shape, kind, class));
            }
            current = class
                .super_name
                .as_deref()
                .and_then(|parent| self.provider.class_info(parent));
        }
        None
    }
}

fn is_generated(
    owner: &str,
    name: &str,
    info: Option<&ClassInfo>,
    method: Option<&MethodInfo>,
) -> bool {
    names::is_synthetic_member_name(name)
        || names::is_synthetic_class_name(owner)
        || method.is_some_and(|method| method.access.is_generated())
        || info.is_some_and(|class| class.kind == smartstep_bytecode::ClassKind::Synthetic)
}

fn render_label(classified: &Classified, params: &str) -> String {
    let owner = classified.display_owner.as_str();
    let member = classified.member.as_str();
    let qualified = if owner.is_empty() {
        member.to_string()
    } else {
        format!("{owner}.{member}")
    };
    match classified.kind {
        ConstructKind::TopLevel => format!("{member}({params})"),
        ConstructKind::Extension => {
            let receiver = classified.receiver.as_deref().unwrap_or("?");
            format!("{receiver}.{member}({params})")
        }
        ConstructKind::PropertyGetter => qualified,
        ConstructKind::PropertySetter => format!("{qualified} ="),
        ConstructKind::Constructor => format!("{owner}({params})"),
        ConstructKind::Member
        | ConstructKind::CompanionMember
        | ConstructKind::ObjectMember
        | ConstructKind::Synthetic
        | ConstructKind::Unknown => format!("{qualified}({params})"),
    }
}

#[cfg(test)]
mod tests {
    use smartstep_bytecode::{AccessFlags, ClassKind, ClassPool, FieldInfo};

    use super::*;

    fn call(kind: InvokeKind, owner: &str, name: &str, descriptor: &str) -> Instruction {
        Instruction {
            kind,
            target: Some(MethodRef::new(owner, name, descriptor)),
            pool_index: 1,
            line: 1,
            offset: 0,
            column: None,
        }
    }

    #[test]
    fn kind_names_parse_case_insensitively() {
        assert_eq!("propertygetter".parse(), Ok(ConstructKind::PropertyGetter));
        assert_eq!(
            "Nope".parse::<ConstructKind>(),
            Err(SmolStr::new("Nope"))
        );
    }

    #[test]
    fn constructor_wins_over_everything() {
        let pool = ClassPool::new();
        let classifier = Classifier::new(&pool);
        let candidate = classifier.classify(
            &call(InvokeKind::Special, "a/Foo$Companion", "<init>", "()V"),
            0,
        );
        assert_eq!(candidate.kind(), ConstructKind::Constructor);
        assert_eq!(candidate.label(), "Foo.Companion()");
    }

    #[test]
    fn facade_name_without_metadata_is_top_level() {
        let pool = ClassPool::new();
        let classifier = Classifier::new(&pool);
        let candidate =
            classifier.classify(&call(InvokeKind::Static, "a/b/UtilKt", "helper", "(I)V"), 0);
        assert_eq!(candidate.kind(), ConstructKind::TopLevel);
        assert_eq!(candidate.logical_owner(), "a.b");
        assert_eq!(candidate.label(), "helper(int)");
    }

    #[test]
    fn missing_metadata_degrades_to_unknown() {
        let pool = ClassPool::new();
        let classifier = Classifier::new(&pool);
        let candidate = classifier.classify(&call(InvokeKind::Virtual, "a/Gone", "f", "()V"), 0);
        assert_eq!(candidate.kind(), ConstructKind::Unknown);
        assert_eq!(candidate.label(), "Gone.f()");
    }

    #[test]
    fn inherited_backing_field_makes_a_getter() {
        let mut pool = ClassPool::new();
        let mut base = ClassInfo::new("a/Base", ClassKind::Class);
        base.fields
            .push(FieldInfo::new("size", "I", AccessFlags::PRIVATE));
        let mut derived = ClassInfo::new("a/Derived", ClassKind::Class);
        derived.super_name = Some("a/Base".into());
        pool.insert(base);
        pool.insert(derived);

        let classifier = Classifier::new(&pool);
        let candidate =
            classifier.classify(&call(InvokeKind::Virtual, "a/Derived", "getSize", "()I"), 0);
        assert_eq!(candidate.kind(), ConstructKind::PropertyGetter);
        assert_eq!(candidate.member(), "size");
        assert_eq!(candidate.logical_owner(), "a.Base");
        assert_eq!(candidate.label(), "Base.size");
        assert_eq!(candidate.declaring_class(), "a.Derived");
    }

    #[test]
    fn own_backing_field_keeps_the_owner() {
        let mut pool = ClassPool::new();
        let mut base = ClassInfo::new("a/Base", ClassKind::Class);
        base.fields
            .push(FieldInfo::new("size", "I", AccessFlags::PRIVATE));
        let mut derived = ClassInfo::new("a/Derived", ClassKind::Class);
        derived.super_name = Some("a/Base".into());
        derived
            .fields
            .push(FieldInfo::new("size", "I", AccessFlags::PRIVATE));
        pool.insert(base);
        pool.insert(derived);

        let classifier = Classifier::new(&pool);
        let candidate =
            classifier.classify(&call(InvokeKind::Virtual, "a/Derived", "getSize", "()I"), 0);
        assert_eq!(candidate.logical_owner(), "a.Derived");
    }

    #[test]
    fn top_level_calls_name_their_source_file() {
        let mut pool = ClassPool::new();
        let mut facade = ClassInfo::new("a/StringsKt", ClassKind::FileFacade);
        facade.source_file = Some("StringUtils.kt".into());
        facade.methods.push(MethodInfo::new(
            "shout",
            "(Ljava/lang/String;)V",
            AccessFlags::PUBLIC | AccessFlags::STATIC,
        ));
        facade.methods.push(
            MethodInfo::new(
                "trimAll",
                "(Ljava/lang/String;)Ljava/lang/String;",
                AccessFlags::PUBLIC | AccessFlags::STATIC,
            )
            .with_receiver("java/lang/String"),
        );
        pool.insert(facade);
        let classifier = Classifier::new(&pool);

        let top = classifier.classify(
            &call(InvokeKind::Static, "a/StringsKt", "shout", "(Ljava/lang/String;)V"),
            0,
        );
        assert_eq!(top.kind(), ConstructKind::TopLevel);
        assert_eq!(top.source_file(), Some("StringUtils.kt"));

        let extension = classifier.classify(
            &call(
                InvokeKind::Static,
                "a/StringsKt",
                "trimAll",
                "(Ljava/lang/String;)Ljava/lang/String;",
            ),
            1,
        );
        assert_eq!(extension.kind(), ConstructKind::Extension);
        assert_eq!(extension.source_file(), Some("StringUtils.kt"));

        let unloaded = classifier.classify(
            &call(InvokeKind::Static, "a/util/IoKt__FilesKt", "readAll", "()V"),
            2,
        );
        assert_eq!(unloaded.kind(), ConstructKind::TopLevel);
        assert_eq!(unloaded.source_file(), Some("Files.kt"));

        let member = classifier.classify(&call(InvokeKind::Virtual, "a/Repo", "save", "()V"), 3);
        assert_eq!(member.source_file(), None);
    }

    #[test]
    fn bridge_flag_marks_synthetic() {
        let mut pool = ClassPool::new();
        let mut class = ClassInfo::new("a/Box", ClassKind::Class);
        class.methods.push(MethodInfo::new(
            "compareTo",
            "(Ljava/lang/Object;)I",
            AccessFlags::PUBLIC | AccessFlags::BRIDGE | AccessFlags::SYNTHETIC,
        ));
        pool.insert(class);
        let classifier = Classifier::new(&pool);
        let candidate = classifier.classify(
            &call(
                InvokeKind::Virtual,
                "a/Box",
                "compareTo",
                "(Ljava/lang/Object;)I",
            ),
            0,
        );
        assert_eq!(candidate.kind(), ConstructKind::Synthetic);
    }
}
