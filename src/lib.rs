//! Static analysis front-end for W3C State Chart XML (SCXML) documents.\
//! \
//! Parses an SCXML document into a typed, fully-resolved intermediate
//! `Model` describing its state tree, transitions and executable content,
//! and classifies which runtime facilities a downstream code generator
//! will need to give the document meaning. This crate never executes a
//! state machine; it only analyzes one.

pub mod common;
pub mod error;
pub mod executable_content;
pub mod expression_classifier;
pub mod feature_detector;
pub mod invoke_resolver;
pub mod model;
pub mod model_resolver;
pub mod state_tree_builder;
pub mod xml_reader;

use std::path::Path;

pub use error::{AnalysisError, Result};
pub use model::Model;

/// Analyzes a single SCXML document, running the full pipeline: XML Reader
/// → State-Tree Builder (which calls the Executable-Content Parser and
/// Invoke Resolver) → Model Resolver → Feature Detector.
///
/// Inline-invoke sibling files are extracted beside `path`.
pub fn analyze_file(path: &Path) -> Result<Model> {
    analyze_file_in(path, None)
}

/// Same as `analyze_file`, but inline-invoke sibling files are extracted
/// into `out_dir` instead of `path`'s own directory when `out_dir` is
/// `Some`, matching the CLI's `-o` override.
pub fn analyze_file_in(path: &Path, out_dir: Option<&Path>) -> Result<Model> {
    let root = xml_reader::read_document(path)?;
    analyze_root(&root, path, out_dir)
}

fn analyze_root(root: &xml_reader::Element, path: &Path, out_dir: Option<&Path>) -> Result<Model> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let mut model = Model::new(name);
    state_tree_builder::build(root, &mut model, path, out_dir);
    model_resolver::resolve(&mut model);
    feature_detector::detect(&mut model);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn s7_inline_invoke_extraction_writes_sibling_file() {
        let dir = std::env::temp_dir().join(format!(
            "scxml_analyzer_test_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let parent_path = dir.join("test347.scxml");
        let xml = r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
            <state id="a">
              <invoke>
                <content>
                  <scxml xmlns="http://www.w3.org/2005/07/scxml" name="machineName">
                    <state id="x"/>
                  </scxml>
                </content>
              </invoke>
            </state>
          </scxml>"#;
        let mut f = std::fs::File::create(&parent_path).unwrap();
        f.write_all(xml.as_bytes()).unwrap();
        drop(f);

        let model = analyze_file(&parent_path).unwrap();
        assert_eq!(model.static_invokes.len(), 1);
        assert_eq!(model.static_invokes[0].child_name, "test347_machineName");
        assert!(dir.join("test347_machineName.scxml").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn out_dir_override_redirects_inline_invoke_extraction() {
        let base = std::env::temp_dir().join(format!(
            "scxml_analyzer_test_outdir_{}",
            std::process::id()
        ));
        let source_dir = base.join("source");
        let out_dir = base.join("out");
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::create_dir_all(&out_dir).unwrap();
        let parent_path = source_dir.join("test348.scxml");
        let xml = r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
            <state id="a">
              <invoke>
                <content>
                  <scxml xmlns="http://www.w3.org/2005/07/scxml" name="childName">
                    <state id="x"/>
                  </scxml>
                </content>
              </invoke>
            </state>
          </scxml>"#;
        let mut f = std::fs::File::create(&parent_path).unwrap();
        f.write_all(xml.as_bytes()).unwrap();
        drop(f);

        let model = analyze_file_in(&parent_path, Some(&out_dir)).unwrap();
        assert_eq!(model.static_invokes.len(), 1);
        assert!(out_dir.join("test348_childName.scxml").exists());
        assert!(!source_dir.join("test348_childName.scxml").exists());

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn reports_io_error_for_missing_file() {
        let err = analyze_file(Path::new("/nonexistent/path/does_not_exist.scxml"))
            .expect_err("should fail");
        assert!(matches!(err, AnalysisError::Io { .. }));
    }
}
