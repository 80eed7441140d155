//! Test fixtures: a tiny class-file assembler plus helpers to lay out
//! classes in directories and jars.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use code_assert_core::model::{BuildOutcome, ModelBuilder};

/// Assembles a class file referencing other classes through field
/// descriptors, super class and interfaces.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    super_class: String,
    interfaces: Vec<String>,
    fields: Vec<(String, String)>,
    methods: Vec<(String, String)>,
    source_file: Option<String>,
}

impl ClassBuilder {
    /// A public class extending `java.lang.Object`; `name` is dotted.
    pub fn new(name: &str) -> Self {
        Self {
            name: internal(name),
            super_class: "java/lang/Object".to_string(),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            source_file: None,
        }
    }

    pub fn extends(mut self, class: &str) -> Self {
        self.super_class = internal(class);
        self
    }

    pub fn implements(mut self, class: &str) -> Self {
        self.interfaces.push(internal(class));
        self
    }

    /// Adds a field of type `class`.
    pub fn uses(mut self, class: &str) -> Self {
        let name = format!("f{}", self.fields.len());
        self.fields.push((name, format!("L{};", internal(class))));
        self
    }

    pub fn method(mut self, name: &str, descriptor: &str) -> Self {
        self.methods.push((name.to_string(), descriptor.to_string()));
        self
    }

    pub fn source_file(mut self, file: &str) -> Self {
        self.source_file = Some(file.to_string());
        self
    }

    /// Path of the class file relative to a class directory.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.class", self.name))
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::default();
        let this_class = pool.class(&self.name);
        let super_class = pool.class(&self.super_class);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        let fields: Vec<(u16, u16)> = self
            .fields
            .iter()
            .map(|(n, d)| (pool.utf8(n), pool.utf8(d)))
            .collect();
        let methods: Vec<(u16, u16)> = self
            .methods
            .iter()
            .map(|(n, d)| (pool.utf8(n), pool.utf8(d)))
            .collect();
        let source_file = self
            .source_file
            .as_deref()
            .map(|f| (pool.utf8("SourceFile"), pool.utf8(f)));

        let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
        push_u16(&mut out, u16::try_from(pool.entries.len() + 1).expect("pool size"));
        for entry in &pool.entries {
            out.extend_from_slice(entry);
        }
        push_u16(&mut out, 0x0021);
        push_u16(&mut out, this_class);
        push_u16(&mut out, super_class);
        push_u16(&mut out, count(interfaces.len()));
        for i in interfaces {
            push_u16(&mut out, i);
        }
        for members in [fields, methods] {
            push_u16(&mut out, count(members.len()));
            for (name, descriptor) in members {
                push_u16(&mut out, 0x0001);
                push_u16(&mut out, name);
                push_u16(&mut out, descriptor);
                push_u16(&mut out, 0);
            }
        }
        match source_file {
            Some((attribute, value)) => {
                push_u16(&mut out, 1);
                push_u16(&mut out, attribute);
                out.extend_from_slice(&2u32.to_be_bytes());
                push_u16(&mut out, value);
            }
            None => push_u16(&mut out, 0),
        }
        out
    }
}

#[derive(Default)]
struct Pool {
    entries: Vec<Vec<u8>>,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Pool {
    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&index) = self.utf8.get(value) {
            return index;
        }
        let mut entry = vec![1];
        push_u16(&mut entry, count(value.len()));
        entry.extend_from_slice(value.as_bytes());
        let index = self.push(entry);
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.classes.get(name) {
            return index;
        }
        let name_index = self.utf8(name);
        let mut entry = vec![7];
        push_u16(&mut entry, name_index);
        let index = self.push(entry);
        self.classes.insert(name.to_string(), index);
        index
    }

    fn push(&mut self, entry: Vec<u8>) -> u16 {
        self.entries.push(entry);
        count(self.entries.len())
    }
}

fn internal(name: &str) -> String {
    name.replace('.', "/")
}

fn count(n: usize) -> u16 {
    u16::try_from(n).expect("count fits in u16")
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Writes each class below `dir` in its package directory.
pub fn write_classes(dir: &Path, classes: &[ClassBuilder]) {
    for class in classes {
        let path = dir.join(class.relative_path());
        std::fs::create_dir_all(path.parent().expect("class path has a parent"))
            .expect("Failed to create package directory");
        std::fs::write(&path, class.build()).expect("Failed to write class");
    }
}

/// Writes a jar with the given `(entry name, content)` pairs.
pub fn write_jar(path: &Path, entries: &[(String, Vec<u8>)]) {
    let file = std::fs::File::create(path).expect("Failed to create jar");
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(name.as_str(), zip::write::FileOptions::default())
            .expect("Failed to start entry");
        zip.write_all(content).expect("Failed to write entry");
    }
    zip.finish().expect("Failed to finish jar");
}

/// Builds a model from `dir`, dropping `java.` classes.
pub fn build(dir: &Path) -> BuildOutcome {
    ModelBuilder::new()
        .input(dir)
        .ignoring_packages(["java."])
        .build()
        .expect("Failed to build model")
}

/// Package names and their sorted `uses`, for compact assertions.
pub fn package_graph(outcome: &BuildOutcome) -> Vec<(String, Vec<String>)> {
    let model = &outcome.model;
    model
        .packages()
        .map(|(id, package)| {
            (
                package.name.clone(),
                model
                    .uses(id)
                    .iter()
                    .map(|&used| model[used].name.clone())
                    .collect(),
            )
        })
        .collect()
}
