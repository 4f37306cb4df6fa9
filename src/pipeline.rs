//! Pipeline driver
//!
//! Runs the stages in order: variables, templates, render, parse, print.
//! Each stage finishes before the next starts, so nothing is produced when
//! any stage fails.

use std::fs;
use std::path::{Path, PathBuf};

use similar::{ChangeTag, TextDiff};
use tracing::{debug, warn};

use crate::ast::types::ScriptNode;
use crate::error::{FileReadError, Result};
use crate::parser::parse;
use crate::printer::{print, PrintConfig};
use crate::template::{compose_root, TemplateSet, ROOT_TEMPLATE};
use crate::vars::VariableTable;

/// Inputs for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Root template file
    pub template: PathBuf,
    /// Prelude prepended to the root template
    pub include: Option<PathBuf>,
    /// Directory of partial templates
    pub incpath: Option<PathBuf>,
    /// Directory of YAML variable files, merged in name order before `secrets`
    pub secpath: Option<PathBuf>,
    /// YAML file of variables, applied before `vars`
    pub secrets: Option<PathBuf>,
    /// `key=value` entries
    pub vars: Vec<String>,
    pub print: PrintConfig,
}

/// Every intermediate product of a successful run.
#[derive(Debug, Clone)]
pub struct Generated {
    /// Template output before parsing
    pub rendered: String,
    pub script: ScriptNode,
    /// Canonical form of `script`
    pub formatted: String,
}

impl Generated {
    /// Unified diff from the rendered text to its canonical form, with 3
    /// lines of context. Empty when formatting changed nothing.
    pub fn diff(&self) -> String {
        let mut output = String::new();
        if self.rendered == self.formatted {
            return output;
        }
        let diff = TextDiff::from_lines(&self.rendered, &self.formatted);
        output.push_str("--- rendered\n");
        output.push_str("+++ formatted\n");
        for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
            output.push_str(&format!("{}\n", hunk.header()));
            for change in hunk.iter_changes() {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };
                output.push_str(sign);
                output.push_str(change.value());
                if !change.value().ends_with('\n') {
                    output.push('\n');
                    output.push_str("\\ No newline at end of file\n");
                }
            }
        }
        output
    }
}

fn read_file(path: &Path) -> std::result::Result<String, FileReadError> {
    fs::read_to_string(path).map_err(|e| FileReadError::new(path, e))
}

/// Build the variable table. Later sources override earlier ones: the
/// secrets directory, then the secrets file, then `key=value` entries.
pub fn build_variables(options: &PipelineOptions) -> Result<VariableTable> {
    let mut table = VariableTable::new();
    if let Some(dir) = &options.secpath {
        for path in dir_files(dir, "secrets")? {
            table.merge_yaml(&read_file(&path)?)?;
        }
    }
    if let Some(path) = &options.secrets {
        table.merge_yaml(&read_file(path)?)?;
    }
    for entry in &options.vars {
        table.insert_entry(entry)?;
    }
    debug!(count = table.len(), "built variable table");
    Ok(table)
}

/// Regular files directly inside `dir`, sorted by name. `kind` names the
/// directory in warnings.
fn dir_files(dir: &Path, kind: &str) -> Result<Vec<PathBuf>> {
    // surfaces a missing or unreadable directory
    fs::read_dir(dir).map_err(|e| FileReadError::new(dir, e))?;

    let pattern = format!("{}/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = glob::glob(&pattern).map_err(|e| {
        FileReadError::new(dir, std::io::Error::new(std::io::ErrorKind::InvalidInput, e.msg))
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            let err: std::io::Error = e.into();
            FileReadError::new(path, err)
        })?;
        if path.is_file() {
            files.push(path);
        } else {
            warn!(path = %path.display(), "skipping non-file entry in {} directory", kind);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse the root template (with prelude) and every partial.
pub fn load_templates(options: &PipelineOptions) -> Result<TemplateSet> {
    let main = read_file(&options.template)?;
    let prelude = match &options.include {
        Some(path) => read_file(path)?,
        None => String::new(),
    };
    let mut set = TemplateSet::new();
    set.parse(ROOT_TEMPLATE, &compose_root(&prelude, &main))?;

    if let Some(dir) = &options.incpath {
        for path in dir_files(dir, "partials")? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            set.parse_partial(&name, &read_file(&path)?)?;
        }
    }
    debug!(templates = set.len(), "loaded templates");
    Ok(set)
}

/// Render, parse and print with already loaded inputs.
pub fn generate(set: &TemplateSet, vars: &VariableTable, config: &PrintConfig) -> Result<Generated> {
    let rendered = set.execute(ROOT_TEMPLATE, &vars.to_value())?;
    debug!(bytes = rendered.len(), "rendered template");
    let script = parse(&rendered)?;
    let formatted = print(&script, config);
    debug!(bytes = formatted.len(), "formatted script");
    Ok(Generated {
        rendered,
        script,
        formatted,
    })
}

/// Run every stage for `options`.
pub fn run(options: &PipelineOptions) -> Result<Generated> {
    let vars = build_variables(options)?;
    let set = load_templates(options)?;
    generate(&set, &vars, &options.print)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_run_substitutes_and_formats() {
        let dir = TempDir::new().unwrap();
        let template = write(&dir, "main.tpl", "if true; then echo {{.USER}}; fi");
        let options = PipelineOptions {
            template,
            vars: vec!["USER=alice".to_string()],
            ..Default::default()
        };
        let out = run(&options).unwrap();
        assert_eq!(out.rendered, "if true; then echo alice; fi");
        assert_eq!(out.formatted, "if true; then\n  echo alice\nfi\n");
    }

    #[test]
    fn test_prelude_and_partials() {
        let dir = TempDir::new().unwrap();
        let parts = dir.path().join("parts");
        fs::create_dir(&parts).unwrap();
        fs::write(parts.join("greet"), "echo hello {{.}}").unwrap();
        fs::create_dir(parts.join("nested")).unwrap();
        let template = write(&dir, "main.tpl", "{{template \"greet\" .NAME}}\n");
        let include = write(&dir, "prelude.sh", "set -e");
        let options = PipelineOptions {
            template,
            include: Some(include),
            incpath: Some(parts),
            vars: vec!["NAME=world".to_string()],
            ..Default::default()
        };
        let out = run(&options).unwrap();
        assert_eq!(out.formatted, "set -e\necho hello world\n");
    }

    #[test]
    fn test_secrets_then_entries() {
        let dir = TempDir::new().unwrap();
        let secrets = write(&dir, "secrets.yaml", "A: from-file\nB: 2\n");
        let options = PipelineOptions {
            secrets: Some(secrets),
            vars: vec!["A=from-cli".to_string()],
            ..Default::default()
        };
        let table = build_variables(&options).unwrap();
        assert_eq!(table.get("A"), Some("from-cli"));
        assert_eq!(table.get("B"), Some("2"));
    }

    #[test]
    fn test_secpath_files_merge_in_name_order() {
        let dir = TempDir::new().unwrap();
        let secdir = dir.path().join("secrets.d");
        fs::create_dir(&secdir).unwrap();
        fs::write(secdir.join("20-site.yaml"), "A: site\nB: site\nC: site\n").unwrap();
        fs::write(secdir.join("10-base.yaml"), "A: base\nB: base\nC: base\nD: base\n").unwrap();
        fs::create_dir(secdir.join("skipped")).unwrap();
        let secrets = write(&dir, "secrets.yaml", "B: file\nC: file\n");
        let options = PipelineOptions {
            secpath: Some(secdir),
            secrets: Some(secrets),
            vars: vec!["C=cli".to_string()],
            ..Default::default()
        };
        let table = build_variables(&options).unwrap();
        assert_eq!(table.get("A"), Some("site"));
        assert_eq!(table.get("B"), Some("file"));
        assert_eq!(table.get("C"), Some("cli"));
        assert_eq!(table.get("D"), Some("base"));

        let options = PipelineOptions {
            secpath: Some(dir.path().join("absent")),
            ..Default::default()
        };
        assert!(matches!(build_variables(&options), Err(Error::FileRead(_))));

        let bad = dir.path().join("bad.d");
        fs::create_dir(&bad).unwrap();
        fs::write(bad.join("x.yaml"), "- not\n- a mapping\n").unwrap();
        let options = PipelineOptions {
            secpath: Some(bad),
            ..Default::default()
        };
        assert!(build_variables(&options).is_err());
    }

    #[test]
    fn test_run_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let parts = dir.path().join("parts");
        fs::create_dir(&parts).unwrap();
        fs::write(parts.join("b"), "echo b {{.}}").unwrap();
        fs::write(parts.join("a"), "echo a {{.}}").unwrap();
        let template = write(
            &dir,
            "main.tpl",
            "{{range $k, $v := .}}export {{$k}}={{$v}}\n{{end}}{{template \"a\" .Z}}\n{{template \"b\" .Y}}\n{{listTemplates}}",
        );
        let options = PipelineOptions {
            template,
            incpath: Some(parts),
            vars: vec!["Z=1".to_string(), "Y=2".to_string(), "X=3".to_string()],
            ..Default::default()
        };
        let first = run(&options).unwrap();
        for _ in 0..5 {
            assert_eq!(run(&options).unwrap().formatted, first.formatted);
        }
        assert_eq!(
            first.formatted,
            "export X=3\nexport Y=2\nexport Z=1\necho a 1\necho b 2\n__main__\na\nb\n"
        );
    }

    #[test]
    fn test_missing_inputs_are_read_errors() {
        let dir = TempDir::new().unwrap();
        let options = PipelineOptions {
            template: dir.path().join("absent.tpl"),
            ..Default::default()
        };
        assert!(matches!(run(&options), Err(Error::FileRead(_))));

        let template = write(&dir, "main.tpl", "echo");
        let options = PipelineOptions {
            template,
            incpath: Some(dir.path().join("no-such-dir")),
            ..Default::default()
        };
        assert!(matches!(run(&options), Err(Error::FileRead(_))));
    }

    #[test]
    fn test_empty_partials_dir_allowed() {
        let dir = TempDir::new().unwrap();
        let parts = dir.path().join("parts");
        fs::create_dir(&parts).unwrap();
        let template = write(&dir, "main.tpl", "echo ok\n");
        let options = PipelineOptions {
            template,
            incpath: Some(parts),
            ..Default::default()
        };
        assert_eq!(run(&options).unwrap().formatted, "echo ok\n");
    }

    #[test]
    fn test_stage_errors() {
        let set_for = |src: &str| {
            let mut set = TemplateSet::new();
            set.parse(ROOT_TEMPLATE, src).map(|_| set)
        };
        let vars = VariableTable::new();
        let config = PrintConfig::default();

        let set = set_for("if true; then echo hi").unwrap();
        match generate(&set, &vars, &config) {
            Err(Error::ShellSyntax(err)) => {
                assert_eq!(err.expected, "`fi`");
                assert_eq!(err.found, "end of input");
            }
            other => panic!("unexpected result {:?}", other),
        }

        let set = set_for("{{template \"missing\"}}").unwrap();
        assert!(matches!(
            generate(&set, &vars, &config),
            Err(Error::TemplateExecute(_))
        ));
        assert!(set_for("{{nofunc}}").is_err());
    }

    #[test]
    fn test_diff() {
        let mut set = TemplateSet::new();
        set.parse(ROOT_TEMPLATE, "if true; then echo hi; fi\n").unwrap();
        let out = generate(&set, &VariableTable::new(), &PrintConfig::default()).unwrap();
        let diff = out.diff();
        assert!(diff.starts_with("--- rendered\n+++ formatted\n@@"));
        assert!(diff.contains("-if true; then echo hi; fi\n"));
        assert!(diff.contains("+  echo hi\n"));

        set.parse(ROOT_TEMPLATE, "echo hi\n").unwrap();
        let out = generate(&set, &VariableTable::new(), &PrintConfig::default()).unwrap();
        assert_eq!(out.diff(), "");

        set.parse(ROOT_TEMPLATE, "if a; then\n  b\nfi\necho c\n").unwrap();
        let out = generate(&set, &VariableTable::new(), &PrintConfig::default()).unwrap();
        assert_eq!(out.rendered, out.formatted);
        assert_eq!(out.diff(), "");
    }

    #[test]
    fn test_empty_render_is_empty_script() {
        let mut set = TemplateSet::new();
        set.parse(ROOT_TEMPLATE, "{{if .X}}echo x{{end}}").unwrap();
        let out = generate(&set, &VariableTable::new(), &PrintConfig::default()).unwrap();
        assert_eq!(out.formatted, "");
        assert!(out.script.body.list.is_none());
    }
}
