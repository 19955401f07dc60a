//! Reads OpenCV cascade XML into a [`HaarCascade`].
//!
//! Both layouts OpenCV ships are understood: the current
//! `opencv-cascade-classifier` one written by `opencv_traincascade`, and the
//! legacy `opencv-haar-classifier` one from `opencv_haartraining`.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::{Document, Node};
use thiserror::Error;

use super::cascade::{
    CascadeError, HaarCascade, HaarFeature, Stage, TreeNode, WeakClassifier, WeightedRect,
};

/// Bias subtracted from stored stage thresholds. The trainers compare with a
/// small tolerance, so detection must too.
const CURRENT_STAGE_EPS: f32 = 1e-5;
const LEGACY_STAGE_EPS: f32 = 1e-4;

#[derive(Error, Debug)]
pub enum CascadeLoadError {
    #[error("failed to read classifier {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("classifier is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("classifier is missing <{0}>")]
    MissingElement(String),
    #[error("invalid number {value:?} in <{element}>")]
    InvalidNumber { element: String, value: String },
    #[error("unsupported classifier: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Invalid(#[from] CascadeError),
}

pub fn load(path: &Path) -> Result<HaarCascade, CascadeLoadError> {
    let text = fs::read_to_string(path).map_err(|source| CascadeLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cascade = parse(&text)?;
    log::debug!(
        "Loaded cascade {} ({} stages, {} features, window {:?})",
        path.display(),
        cascade.stages().len(),
        cascade.features().len(),
        cascade.window_size()
    );
    Ok(cascade)
}

pub fn parse(xml: &str) -> Result<HaarCascade, CascadeLoadError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let cascade = elements(root)
        .next()
        .ok_or_else(|| CascadeLoadError::MissingElement("cascade".into()))?;

    match cascade.attribute("type_id") {
        Some("opencv-cascade-classifier") => parse_current(cascade),
        Some("opencv-haar-classifier") => parse_legacy(cascade),
        _ if optional_child(cascade, "stageType").is_some() => parse_current(cascade),
        _ if optional_child(cascade, "size").is_some() => parse_legacy(cascade),
        other => Err(CascadeLoadError::Unsupported(format!(
            "unknown cascade layout {}",
            other.unwrap_or("<untyped>")
        ))),
    }
}

// ── Current layout ──────────────────────────────────────────────

fn parse_current(cascade: Node) -> Result<HaarCascade, CascadeLoadError> {
    let stage_type = text(child(cascade, "stageType")?);
    if stage_type != "BOOST" {
        return Err(CascadeLoadError::Unsupported(format!(
            "stage type {stage_type}"
        )));
    }
    let feature_type = text(child(cascade, "featureType")?);
    if feature_type != "HAAR" {
        return Err(CascadeLoadError::Unsupported(format!(
            "feature type {feature_type}"
        )));
    }
    if let Some(params) = optional_child(cascade, "featureParams") {
        if let Some(max_cat) = optional_child(params, "maxCatCount") {
            if number::<u32>(max_cat)? != 0 {
                return Err(CascadeLoadError::Unsupported(
                    "categorical features".into(),
                ));
            }
        }
    }

    let width = number::<u32>(child(cascade, "width")?)?;
    let height = number::<u32>(child(cascade, "height")?)?;

    let mut stages = Vec::new();
    for stage in elements(child(cascade, "stages")?) {
        let threshold = number::<f32>(child(stage, "stageThreshold")?)? - CURRENT_STAGE_EPS;
        let mut classifiers = Vec::new();
        for weak in elements(child(stage, "weakClassifiers")?) {
            classifiers.push(parse_weak_classifier(weak)?);
        }
        stages.push(Stage {
            threshold,
            classifiers,
        });
    }

    let mut features = Vec::new();
    for feature in elements(child(cascade, "features")?) {
        features.push(parse_feature(feature)?);
    }

    Ok(HaarCascade::new((width, height), stages, features)?)
}

/// `internalNodes` holds `left right feature threshold` per node.
fn parse_weak_classifier(weak: Node) -> Result<WeakClassifier, CascadeLoadError> {
    let nodes_el = child(weak, "internalNodes")?;
    let tokens: Vec<&str> = text(nodes_el).split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 4 != 0 {
        return Err(invalid(nodes_el, text(nodes_el)));
    }
    let nodes = tokens
        .chunks(4)
        .map(|t| {
            Ok(TreeNode {
                left: parse_token(nodes_el, t[0])?,
                right: parse_token(nodes_el, t[1])?,
                feature: parse_token(nodes_el, t[2])?,
                threshold: parse_token(nodes_el, t[3])?,
            })
        })
        .collect::<Result<Vec<_>, CascadeLoadError>>()?;
    let leaves = numbers::<f32>(child(weak, "leafValues")?)?;
    Ok(WeakClassifier { nodes, leaves })
}

// ── Legacy layout ───────────────────────────────────────────────

fn parse_legacy(cascade: Node) -> Result<HaarCascade, CascadeLoadError> {
    let size_el = child(cascade, "size")?;
    let size = numbers::<u32>(size_el)?;
    let [width, height] = size[..] else {
        return Err(invalid(size_el, text(size_el)));
    };

    let mut stages = Vec::new();
    let mut features = Vec::new();
    for stage in elements(child(cascade, "stages")?) {
        let mut classifiers = Vec::new();
        for tree in elements(child(stage, "trees")?) {
            classifiers.push(parse_legacy_tree(tree, &mut features)?);
        }
        let threshold = number::<f32>(child(stage, "stage_threshold")?)? - LEGACY_STAGE_EPS;
        stages.push(Stage {
            threshold,
            classifiers,
        });
    }

    Ok(HaarCascade::new((width, height), stages, features)?)
}

/// Legacy trees embed one feature per node and store leaf values inline;
/// both are flattened into the shared tables of the current layout.
fn parse_legacy_tree(
    tree: Node,
    features: &mut Vec<HaarFeature>,
) -> Result<WeakClassifier, CascadeLoadError> {
    let mut nodes = Vec::new();
    let mut leaves = Vec::new();
    for node in elements(tree) {
        features.push(parse_feature(child(node, "feature")?)?);
        let feature = features.len() - 1;
        let threshold = number::<f32>(child(node, "threshold")?)?;
        let left = legacy_child(node, "left_val", "left_node", &mut leaves)?;
        let right = legacy_child(node, "right_val", "right_node", &mut leaves)?;
        nodes.push(TreeNode {
            feature,
            threshold,
            left,
            right,
        });
    }
    Ok(WeakClassifier { nodes, leaves })
}

fn legacy_child(
    node: Node,
    val_name: &str,
    node_name: &str,
    leaves: &mut Vec<f32>,
) -> Result<i32, CascadeLoadError> {
    if let Some(val) = optional_child(node, val_name) {
        leaves.push(number::<f32>(val)?);
        return Ok(-((leaves.len() - 1) as i32));
    }
    match optional_child(node, node_name) {
        Some(next) => number::<i32>(next),
        None => Err(CascadeLoadError::MissingElement(format!(
            "{val_name}|{node_name}"
        ))),
    }
}

// ── Shared pieces ───────────────────────────────────────────────

/// `rects` holds `x y width height weight` per rectangle.
fn parse_feature(feature: Node) -> Result<HaarFeature, CascadeLoadError> {
    if let Some(tilted) = optional_child(feature, "tilted") {
        if number::<u32>(tilted)? != 0 {
            return Err(CascadeLoadError::Unsupported("tilted Haar features".into()));
        }
    }
    let mut rects = Vec::new();
    for rect in elements(child(feature, "rects")?) {
        let tokens: Vec<&str> = text(rect).split_whitespace().collect();
        let [x, y, w, h, weight] = tokens[..] else {
            return Err(invalid(rect, text(rect)));
        };
        rects.push(WeightedRect {
            x: parse_token(rect, x)?,
            y: parse_token(rect, y)?,
            width: parse_token(rect, w)?,
            height: parse_token(rect, h)?,
            weight: parse_token(rect, weight)?,
        });
    }
    Ok(HaarFeature { rects })
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn optional_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.has_tag_name(name))
}

fn child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, CascadeLoadError> {
    optional_child(node, name).ok_or_else(|| CascadeLoadError::MissingElement(name.to_string()))
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("").trim()
}

fn invalid(node: Node, value: &str) -> CascadeLoadError {
    CascadeLoadError::InvalidNumber {
        element: node.tag_name().name().to_string(),
        value: value.to_string(),
    }
}

fn parse_token<T: FromStr>(node: Node, token: &str) -> Result<T, CascadeLoadError> {
    token.parse().map_err(|_| invalid(node, token))
}

fn number<T: FromStr>(node: Node) -> Result<T, CascadeLoadError> {
    parse_token(node, text(node))
}

fn numbers<T: FromStr>(node: Node) -> Result<Vec<T>, CascadeLoadError> {
    text(node)
        .split_whitespace()
        .map(|t| parse_token(node, t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    const SYNTHETIC: &str = include_str!("../../../tests/fixtures/synthetic_plate_cascade.xml");

    const LEGACY: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<tiny_cascade type_id="opencv-haar-classifier">
  <size>4 4</size>
  <stages>
    <_>
      <!-- stage 0 -->
      <trees>
        <_>
          <!-- tree 0 -->
          <_>
            <feature>
              <rects>
                <_>0 0 2 4 -1.</_>
                <_>2 0 2 4 1.</_></rects>
              <tilted>0</tilted></feature>
            <threshold>0.1</threshold>
            <left_val>-0.5</left_val>
            <right_node>1</right_node></_>
          <_>
            <feature>
              <rects>
                <_>0 0 4 2 1.</_>
                <_>0 2 4 2 -1.</_></rects>
              <tilted>0</tilted></feature>
            <threshold>0.2</threshold>
            <left_val>0.25</left_val>
            <right_val>0.75</right_val></_></_></trees>
      <stage_threshold>0.5</stage_threshold>
      <parent>-1</parent>
      <next>-1</next></_></stages></tiny_cascade>
</opencv_storage>
"#;

    fn current_with(feature_type: &str, rect: &str, extra: &str) -> String {
        format!(
            r#"<opencv_storage><cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType><featureType>{feature_type}</featureType>
  <height>4</height><width>4</width>
  <stages><_><stageThreshold>0.</stageThreshold><weakClassifiers>
    <_><internalNodes>0 -1 0 0.5</internalNodes><leafValues>-1. 1.</leafValues></_>
  </weakClassifiers></_></stages>
  <features><_><rects><_>{rect}</_></rects>{extra}</_></features>
</cascade></opencv_storage>"#
        )
    }

    #[test]
    fn test_parse_current_layout() {
        let cascade = parse(SYNTHETIC).unwrap();
        assert_eq!(cascade.window_size(), (34, 14));
        assert_eq!(cascade.stages().len(), 2);
        assert_eq!(cascade.features().len(), 5);

        let stage1 = &cascade.stages()[1];
        assert_relative_eq!(stage1.threshold, 3.5 - CURRENT_STAGE_EPS);
        assert_eq!(stage1.classifiers.len(), 3);

        let tree = &stage1.classifiers[2];
        assert_eq!(
            tree.nodes,
            vec![
                TreeNode {
                    left: 0,
                    right: 1,
                    feature: 3,
                    threshold: 0.02
                },
                TreeNode {
                    left: -1,
                    right: -2,
                    feature: 4,
                    threshold: 0.02
                },
            ]
        );
        assert_eq!(tree.leaves, vec![-1.0, -1.0, 2.0]);

        let centre = &cascade.features()[0].rects[1];
        assert_eq!((centre.x, centre.y, centre.width, centre.height), (2, 2, 30, 10));
        assert_relative_eq!(centre.weight, 1.5866667);
    }

    #[test]
    fn test_parse_legacy_layout_flattens_trees() {
        let cascade = parse(LEGACY).unwrap();
        assert_eq!(cascade.window_size(), (4, 4));
        assert_eq!(cascade.features().len(), 2);

        let stage = &cascade.stages()[0];
        assert_relative_eq!(stage.threshold, 0.5 - LEGACY_STAGE_EPS);
        let tree = &stage.classifiers[0];
        assert_eq!(tree.leaves, vec![-0.5, 0.25, 0.75]);
        assert_eq!((tree.nodes[0].left, tree.nodes[0].right), (0, 1));
        assert_eq!((tree.nodes[1].left, tree.nodes[1].right), (-1, -2));
        assert_eq!(tree.nodes[1].feature, 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SYNTHETIC.as_bytes()).unwrap();
        let cascade = load(file.path()).unwrap();
        assert_eq!(cascade.window_size(), (34, 14));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.xml")).unwrap_err();
        assert!(matches!(err, CascadeLoadError::Io { .. }));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            parse("<opencv_storage><cascade>"),
            Err(CascadeLoadError::Xml(_))
        ));
    }

    #[test]
    fn test_unsupported_feature_type() {
        let xml = current_with("LBP", "0 0 2 2 1.", "");
        assert!(matches!(parse(&xml), Err(CascadeLoadError::Unsupported(_))));
    }

    #[test]
    fn test_tilted_feature_is_unsupported() {
        let xml = current_with("HAAR", "0 0 2 2 1.", "<tilted>1</tilted>");
        assert!(matches!(parse(&xml), Err(CascadeLoadError::Unsupported(_))));
    }

    #[test]
    fn test_bad_number_names_element() {
        let xml = current_with("HAAR", "0 0 two 2 1.", "");
        match parse(&xml) {
            Err(CascadeLoadError::InvalidNumber { value, .. }) => assert_eq!(value, "two"),
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
    }

    #[test]
    fn test_short_rect_is_rejected() {
        let xml = current_with("HAAR", "0 0 2 2", "");
        assert!(matches!(
            parse(&xml),
            Err(CascadeLoadError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_rect_outside_window_is_invalid() {
        let xml = current_with("HAAR", "2 2 3 3 1.", "");
        assert!(matches!(
            parse(&xml),
            Err(CascadeLoadError::Invalid(CascadeError::RectOutOfWindow { .. }))
        ));
    }

    #[test]
    fn test_missing_stages() {
        let xml = r#"<opencv_storage><cascade type_id="opencv-cascade-classifier">
            <stageType>BOOST</stageType><featureType>HAAR</featureType>
            <height>4</height><width>4</width></cascade></opencv_storage>"#;
        match parse(xml) {
            Err(CascadeLoadError::MissingElement(name)) => assert_eq!(name, "stages"),
            other => panic!("expected MissingElement, got {other:?}"),
        }
    }
}
