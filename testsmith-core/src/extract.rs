//! Function catalog and snippet extraction over Python sources.
//!
//! Both halves parse with tree-sitter: the catalog walks every `*.py` file
//! under a directory and records each `function_definition` node's name in
//! source order (nested definitions are listed flatly alongside top-level
//! ones), and the snippet extractor re-parses one file's text to pull out
//! the exact source of the first definition matching a name.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use tree_sitter::{Node, Parser, Tree};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// File suffix selecting which repository files are catalogued.
pub const SOURCE_SUFFIX: &str = ".py";

const FUNCTION_NODE_KIND: &str = "function_definition";

/// One catalogued source file: its path and every function name found in
/// it, in order of textual appearance.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub functions: Vec<String>,
}

fn python_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::Grammar(e.to_string()))?;
    Ok(parser)
}

/// Parses `source` and rejects trees containing syntax errors: a file the
/// grammar cannot fully account for aborts extraction rather than yielding
/// a partial catalog.
fn parse_source(source: &str, path: &Path) -> Result<Tree> {
    let mut parser = python_parser()?;
    let tree = parser.parse(source, None).ok_or_else(|| Error::Parse {
        path: path.display().to_string(),
        message: "parser returned no tree".to_string(),
    })?;
    if tree.root_node().has_error() {
        return Err(Error::Parse {
            path: path.display().to_string(),
            message: "source contains syntax errors".to_string(),
        });
    }
    Ok(tree)
}

fn collect_function_names(node: Node<'_>, source: &[u8], names: &mut Vec<String>) {
    if node.kind() == FUNCTION_NODE_KIND {
        if let Some(name_node) = node.child_by_field_name("name") {
            if let Ok(name) = name_node.utf8_text(source) {
                names.push(name.to_string());
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_function_names(child, source, names);
    }
}

/// Lists every function name defined in one Python file.
pub fn functions_in_file(path: &Path) -> Result<Vec<String>> {
    let source = fs::read_to_string(path)?;
    let tree = parse_source(&source, path)?;
    let mut names = Vec::new();
    collect_function_names(tree.root_node(), source.as_bytes(), &mut names);
    Ok(names)
}

/// Builds the function catalog for a repository checkout.
///
/// Walks every `*.py` file under `repo_dir` in sorted order; files with no
/// function definitions are omitted. Any unparsable file fails the whole
/// catalog.
pub fn catalog(repo_dir: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(repo_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(SOURCE_SUFFIX) {
            continue;
        }
        let functions = functions_in_file(entry.path())?;
        if functions.is_empty() {
            continue;
        }
        debug!(
            path = %entry.path().display(),
            count = functions.len(),
            "Catalogued source file"
        );
        files.push(SourceFile {
            path: entry.path().to_path_buf(),
            functions,
        });
    }
    Ok(files)
}

fn find_function<'tree>(
    node: Node<'tree>,
    source: &[u8],
    function_name: &str,
) -> Option<Node<'tree>> {
    if node.kind() == FUNCTION_NODE_KIND {
        let name = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(source).ok());
        if name == Some(function_name) {
            return Some(node);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_function(child, source, function_name) {
            return Some(found);
        }
    }
    None
}

/// Returns the exact source text of the first definition of
/// `function_name` within `source`, or `None` when no definition matches.
/// Decorated definitions are returned with their decorator lines.
///
/// When a file defines the same name twice, only the first definition is
/// ever reachable through this interface.
pub fn function_snippet(function_name: &str, source: &str) -> Result<Option<String>> {
    let tree = parse_source(source, Path::new("<source>"))?;
    let node = find_function(tree.root_node(), source.as_bytes(), function_name);
    Ok(node.map(|node| {
        // Decorators are siblings wrapped in a `decorated_definition`
        // parent, not children of the function node itself.
        let node = match node.parent() {
            Some(parent) if parent.kind() == "decorated_definition" => parent,
            _ => node,
        };
        source[node.byte_range()].to_string()
    }))
}
