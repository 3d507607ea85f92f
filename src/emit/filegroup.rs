//! CMake INTERFACE library emission.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::core::cmake_target::CMakeTarget;

const SEP: &str = "\n        ";

/// Contents of one file-group library. Every list is emitted sorted and
/// deduplicated; empty lists produce no statement.
#[derive(Debug, Clone, Copy)]
pub struct FilegroupSpec<'a> {
    pub cmake_name: &'a CMakeTarget,
    pub files: &'a [String],
    pub link_libraries: &'a [CMakeTarget],
    pub public_includes: &'a [String],
    pub system_includes: &'a [String],
    pub add_dependencies: &'a [CMakeTarget],
}

/// Write an `INTERFACE` library carrying files, link libraries and include
/// directories to `out`.
pub fn emit_filegroup(out: &mut String, spec: &FilegroupSpec<'_>) {
    let name = spec.cmake_name;
    writeln!(out, "add_library({} INTERFACE)", name).unwrap();

    let files = sorted_quoted(spec.files.iter().map(String::as_str));
    if !files.is_empty() {
        writeln!(out, "target_sources({} INTERFACE{}{})", name, SEP, files.join(SEP)).unwrap();
    }

    let libs = sorted_quoted(spec.link_libraries.iter().map(CMakeTarget::as_str));
    if !libs.is_empty() {
        writeln!(
            out,
            "target_link_libraries({} INTERFACE{}{})",
            name,
            SEP,
            libs.join(SEP)
        )
        .unwrap();
    }

    let public = sorted_quoted(spec.public_includes.iter().map(String::as_str));
    if !public.is_empty() {
        writeln!(
            out,
            "target_include_directories({} INTERFACE{}{})",
            name,
            SEP,
            public.join(SEP)
        )
        .unwrap();
    }

    let system = sorted_quoted(spec.system_includes.iter().map(String::as_str));
    if !system.is_empty() {
        writeln!(
            out,
            "target_include_directories({} SYSTEM INTERFACE{}{})",
            name,
            SEP,
            system.join(SEP)
        )
        .unwrap();
    }

    let deps: BTreeSet<&str> = spec.add_dependencies.iter().map(CMakeTarget::as_str).collect();
    if !deps.is_empty() {
        let deps: Vec<&str> = deps.into_iter().collect();
        writeln!(out, "add_dependencies({} {})", name, deps.join(" ")).unwrap();
    }
}

/// Quote a string as a CMake bracket-free argument.
pub fn quote_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn sorted_quoted<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    items
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(quote_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_filegroup() {
        let name = CMakeTarget::new("main_pkg_lib");
        let files = strings(&["${PROJECT_SOURCE_DIR}/pkg/b.proto", "${PROJECT_SOURCE_DIR}/pkg/a.proto"]);
        let libs = vec![CMakeTarget::new("main_pkg_common"), CMakeTarget::new("protobuf::libprotobuf")];
        let public = strings(&["${PROJECT_SOURCE_DIR}/pkg"]);
        let system = strings(&["${Protobuf_IMPORT_DIRS}"]);
        let deps = vec![CMakeTarget::new("gen_b"), CMakeTarget::new("gen_a")];

        let mut out = String::new();
        emit_filegroup(
            &mut out,
            &FilegroupSpec {
                cmake_name: &name,
                files: &files,
                link_libraries: &libs,
                public_includes: &public,
                system_includes: &system,
                add_dependencies: &deps,
            },
        );

        let expected = "\
add_library(main_pkg_lib INTERFACE)
target_sources(main_pkg_lib INTERFACE
        \"${PROJECT_SOURCE_DIR}/pkg/a.proto\"
        \"${PROJECT_SOURCE_DIR}/pkg/b.proto\")
target_link_libraries(main_pkg_lib INTERFACE
        \"main_pkg_common\"
        \"protobuf::libprotobuf\")
target_include_directories(main_pkg_lib INTERFACE
        \"${PROJECT_SOURCE_DIR}/pkg\")
target_include_directories(main_pkg_lib SYSTEM INTERFACE
        \"${Protobuf_IMPORT_DIRS}\")
add_dependencies(main_pkg_lib gen_a gen_b)
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_empty_lists_are_omitted() {
        let name = CMakeTarget::new("x");
        let mut out = String::new();
        emit_filegroup(
            &mut out,
            &FilegroupSpec {
                cmake_name: &name,
                files: &[],
                link_libraries: &[],
                public_includes: &[],
                system_includes: &[],
                add_dependencies: &[],
            },
        );
        assert_eq!(out, "add_library(x INTERFACE)\n");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
