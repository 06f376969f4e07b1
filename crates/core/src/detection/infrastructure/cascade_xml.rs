//! Loader for OpenCV's `opencv-cascade-classifier` XML files
//! (the layout written by `opencv_traincascade` and shipped under
//! `data/haarcascades` since OpenCV 2.4).

use std::fs;
use std::path::Path;
use std::str::FromStr;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::detection::infrastructure::cascade_model::{
    CascadeError, CascadeModel, HaarFeature, HaarRect, Stage, TreeNode, WeakTree,
};

/// Subtracted from each stage threshold on load; a stage sum equal to the
/// trained threshold passes.
const STAGE_THRESHOLD_EPS: f32 = 1e-5;

/// Fields per internal node: left, right, feature index, threshold.
const NODE_FIELDS: usize = 4;

pub fn load(path: &Path) -> Result<CascadeModel, CascadeError> {
    let xml = fs::read_to_string(path).map_err(|e| CascadeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let model = parse(&xml)?;
    let (w, h) = model.window_size();
    log::info!(
        "Loaded cascade {} ({w}x{h} window, {} stages, {} features)",
        path.display(),
        model.stages().len(),
        model.features().len()
    );
    Ok(model)
}

pub fn parse(xml: &str) -> Result<CascadeModel, CascadeError> {
    let document = XmlNode::parse(xml)?;
    let storage = document
        .child("opencv_storage")
        .ok_or_else(|| CascadeError::Missing("opencv_storage".into()))?;

    let Some(cascade) = storage.child("cascade") else {
        if storage.children.iter().any(|c| c.child("stages").is_some()) {
            return Err(CascadeError::Unsupported(
                "legacy opencv-haar-classifier layout; use the OpenCV 4.x data file".into(),
            ));
        }
        return Err(CascadeError::Missing("cascade".into()));
    };

    let stage_type = cascade.required("stageType")?.text.as_str();
    if stage_type != "BOOST" {
        return Err(CascadeError::Unsupported(format!("stage type {stage_type}")));
    }
    let feature_type = cascade.required("featureType")?.text.as_str();
    if !feature_type.eq_ignore_ascii_case("HAAR") {
        return Err(CascadeError::Unsupported(format!("feature type {feature_type}")));
    }
    if let Some(max_cat) = cascade
        .child("featureParams")
        .and_then(|p| p.child("maxCatCount"))
    {
        if max_cat.number::<u32>()? > 0 {
            return Err(CascadeError::Unsupported("categorical splits".into()));
        }
    }

    let width = cascade.required("width")?.number::<u32>()?;
    let height = cascade.required("height")?.number::<u32>()?;

    let stages = cascade
        .required("stages")?
        .items()
        .enumerate()
        .map(|(i, node)| parse_stage(node).map_err(|e| in_context(e, &format!("stage {i}"))))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(declared) = cascade.child("stageNum") {
        let declared = declared.number::<usize>()?;
        if declared != stages.len() {
            log::warn!(
                "Cascade declares {declared} stages but contains {}",
                stages.len()
            );
        }
    }

    let features = cascade
        .required("features")?
        .items()
        .enumerate()
        .map(|(i, node)| parse_feature(node).map_err(|e| in_context(e, &format!("feature {i}"))))
        .collect::<Result<Vec<_>, _>>()?;

    CascadeModel::new(width, height, stages, features)
}

fn parse_stage(node: &XmlNode) -> Result<Stage, CascadeError> {
    let threshold = node.required("stageThreshold")?.number::<f32>()? - STAGE_THRESHOLD_EPS;
    let trees = node
        .required("weakClassifiers")?
        .items()
        .map(parse_tree)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(declared) = node.child("maxWeakCount") {
        if declared.number::<usize>()? != trees.len() {
            return Err(CascadeError::Invalid(format!(
                "maxWeakCount {} but {} weak classifiers",
                declared.text,
                trees.len()
            )));
        }
    }
    Ok(Stage { threshold, trees })
}

fn parse_tree(node: &XmlNode) -> Result<WeakTree, CascadeError> {
    let fields = node.required("internalNodes")?.tokens();
    if fields.is_empty() || fields.len() % NODE_FIELDS != 0 {
        return Err(CascadeError::Invalid(format!(
            "internalNodes has {} values, expected a multiple of {NODE_FIELDS}",
            fields.len()
        )));
    }

    let nodes = fields
        .chunks_exact(NODE_FIELDS)
        .map(|f| {
            Ok(TreeNode {
                left: parse_token(f[0])?,
                right: parse_token(f[1])?,
                feature: parse_token(f[2])?,
                threshold: parse_token(f[3])?,
            })
        })
        .collect::<Result<Vec<_>, CascadeError>>()?;

    let leaves = node
        .required("leafValues")?
        .tokens()
        .into_iter()
        .map(parse_token::<f32>)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WeakTree { nodes, leaves })
}

fn parse_feature(node: &XmlNode) -> Result<HaarFeature, CascadeError> {
    let rects = node
        .required("rects")?
        .items()
        .map(|r| {
            let v = r.tokens();
            if v.len() != 5 {
                return Err(CascadeError::Invalid(format!(
                    "rect '{}' needs x y w h weight",
                    r.text
                )));
            }
            Ok(HaarRect {
                x: parse_token(v[0])?,
                y: parse_token(v[1])?,
                width: parse_token(v[2])?,
                height: parse_token(v[3])?,
                weight: parse_token(v[4])?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let tilted = match node.child("tilted") {
        Some(t) => t.number::<i32>()? != 0,
        None => false,
    };

    Ok(HaarFeature { rects, tilted })
}

fn parse_token<T: FromStr>(token: &str) -> Result<T, CascadeError> {
    token
        .parse()
        .map_err(|_| CascadeError::Invalid(format!("cannot parse '{token}'")))
}

fn in_context(err: CascadeError, context: &str) -> CascadeError {
    match err {
        CascadeError::Invalid(msg) => CascadeError::Invalid(format!("{context}: {msg}")),
        CascadeError::Missing(tag) => CascadeError::Missing(format!("{tag}> in <{context}")),
        other => other,
    }
}

/// Minimal element tree: OpenCV storage files carry everything in element
/// text, so attributes are not kept.
#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    fn parse(xml: &str) -> Result<XmlNode, CascadeError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack = vec![XmlNode::named(b"#document")];
        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(XmlNode::named(e.name().as_ref())),
                Event::Empty(e) => {
                    let node = XmlNode::named(e.name().as_ref());
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        if !top.text.is_empty() {
                            top.text.push(' ');
                        }
                        top.text.push_str(t.unescape()?.trim());
                    }
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(CascadeError::Invalid("unbalanced closing tag".into()));
                    }
                    if let Some(node) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(node);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        match (stack.pop(), stack.is_empty()) {
            (Some(document), true) => Ok(document),
            _ => Err(CascadeError::Invalid("unclosed element".into())),
        }
    }

    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn required(&self, name: &str) -> Result<&XmlNode, CascadeError> {
        self.child(name)
            .ok_or_else(|| CascadeError::Missing(name.to_string()))
    }

    /// Sequence entries, written as `<_>` elements.
    fn items(&self) -> impl Iterator<Item = &XmlNode> {
        self.children.iter().filter(|c| c.name == "_")
    }

    fn tokens(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    fn number<T: FromStr>(&self) -> Result<T, CascadeError> {
        parse_token(self.text.trim())
            .map_err(|_| CascadeError::Invalid(format!("<{}> is not a number: '{}'", self.name, self.text)))
    }
}
