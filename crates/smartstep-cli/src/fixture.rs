//! Class fixtures: loaded classes described in TOML.
//!
//! ```toml
//! [[class]]
//! name = "demo/MainKt"
//! kind = "file-facade"
//! source_file = "Main.kt"
//!
//! [[class.method]]
//! name = "main"
//! descriptor = "()V"
//! access = ["public", "static"]
//! code = """
//! line 10
//! invokestatic demo/MainKt.helper ()V
//! return
//! """
//! ```

use std::path::Path;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use smartstep_bytecode::{
    parse_listing, AccessFlags, ClassInfo, ClassKind, ClassPool, FieldInfo, MethodInfo,
};
use smol_str::SmolStr;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureFile {
    #[serde(default, rename = "class")]
    classes: Vec<ClassEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassEntry {
    name: SmolStr,
    #[serde(default)]
    kind: ClassKind,
    access: Option<Vec<String>>,
    #[serde(rename = "super")]
    super_name: Option<SmolStr>,
    #[serde(default)]
    interfaces: Vec<SmolStr>,
    source_file: Option<SmolStr>,
    #[serde(default, rename = "field")]
    fields: Vec<FieldEntry>,
    #[serde(default, rename = "method")]
    methods: Vec<MethodEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldEntry {
    name: SmolStr,
    descriptor: SmolStr,
    #[serde(default)]
    access: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodEntry {
    name: SmolStr,
    descriptor: SmolStr,
    #[serde(default)]
    access: Vec<String>,
    /// Extension receiver (internal name).
    receiver: Option<SmolStr>,
    /// Code listing; omitted for abstract, native and library methods.
    code: Option<String>,
}

pub fn load_fixture(path: &Path) -> anyhow::Result<ClassPool> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    parse_fixture(&text).with_context(|| format!("invalid fixture {}", path.display()))
}

pub fn parse_fixture(text: &str) -> anyhow::Result<ClassPool> {
    let file: FixtureFile = toml::from_str(text)?;
    let mut pool = ClassPool::new();
    for entry in file.classes {
        let name = entry.name.clone();
        let class = build_class(entry).with_context(|| format!("class {name}"))?;
        if pool.insert(class).is_some() {
            anyhow::bail!("class {name} is defined twice");
        }
    }
    debug!(classes = pool.len(), "loaded fixture");
    Ok(pool)
}

fn build_class(entry: ClassEntry) -> anyhow::Result<ClassInfo> {
    let mut class = ClassInfo::new(entry.name, entry.kind);
    if let Some(access) = &entry.access {
        class.access = flags(access)?;
    }
    if entry.super_name.is_some() {
        class.super_name = entry.super_name;
    }
    class.interfaces = entry.interfaces;
    class.source_file = entry.source_file;
    for field in entry.fields {
        let access = flags(&field.access).with_context(|| format!("field {}", field.name))?;
        class
            .fields
            .push(FieldInfo::new(field.name, field.descriptor, access));
    }
    for method in entry.methods {
        let label = format!("method {}{}", method.name, method.descriptor);
        let access = flags(&method.access).with_context(|| label.clone())?;
        let mut info = MethodInfo::new(method.name, method.descriptor, access);
        if let Some(receiver) = method.receiver {
            info = info.with_receiver(receiver);
        }
        if let Some(code) = &method.code {
            let body = parse_listing(code, &mut class.constant_pool).with_context(|| label)?;
            info = info.with_body(body);
        }
        class.methods.push(info);
    }
    Ok(class)
}

fn flags(names: &[String]) -> anyhow::Result<AccessFlags> {
    AccessFlags::from_names(names.iter().map(String::as_str))
        .map_err(|name| anyhow!("unknown access flag '{name}'"))
}
