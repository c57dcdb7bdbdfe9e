//! 大纲快照
//!
//! 以 JSON 描述一个文档的大纲，方便宿主应用和测试直接构造模型。

use crate::error::OutlineError;
use crate::model::{OutlineModel, OutlineModelBuilder};
use crate::symbol::{Range, SymbolInformation, SymbolKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use url::Url;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlineSnapshot {
    pub uri: Url,
    #[serde(default)]
    pub groups: Vec<GroupSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub extension_id: String,
    #[serde(default)]
    pub symbols: Vec<SymbolSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub name: String,
    pub kind: SymbolKind,
    pub range: Range,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SymbolSnapshot>,
}

impl OutlineSnapshot {
    pub fn from_json(json: &str) -> Result<Self, OutlineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, OutlineError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn build(&self) -> Rc<OutlineModel> {
        let mut builder = OutlineModelBuilder::new(self.uri.clone());
        for group in &self.groups {
            let group_id = builder.add_group(group.extension_id.clone());
            for symbol in &group.symbols {
                self.add_symbol(&mut builder, &group_id, symbol, None);
            }
        }
        builder.build()
    }

    fn add_symbol(
        &self,
        builder: &mut OutlineModelBuilder,
        parent: &str,
        symbol: &SymbolSnapshot,
        container: Option<&str>,
    ) {
        let mut information =
            SymbolInformation::new(symbol.name.clone(), symbol.kind, self.uri.clone(), symbol.range);
        information.container_name = container.map(str::to_string);

        let Some(id) = builder.add_element(parent, information) else {
            return;
        };
        for child in &symbol.children {
            self.add_symbol(builder, &id, child, Some(&symbol.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeNode;
    use pretty_assertions::assert_eq;

    const SNAPSHOT: &str = r#"{
        "uri": "file:///work/src/main.rs",
        "groups": [
            {
                "extension_id": "rust-lang.rust-analyzer",
                "symbols": [
                    {
                        "name": "App",
                        "kind": "struct",
                        "range": { "start": { "line_number": 1, "column": 1 }, "end": { "line_number": 9, "column": 2 } },
                        "children": [
                            {
                                "name": "title",
                                "kind": "field",
                                "range": { "start": { "line_number": 2, "column": 5 }, "end": { "line_number": 2, "column": 20 } }
                            }
                        ]
                    }
                ]
            },
            { "extension_id": "vscode.markdown" }
        ]
    }"#;

    #[test]
    fn test_build_from_json() {
        let snapshot = OutlineSnapshot::from_json(SNAPSHOT).unwrap();
        let model = snapshot.build();

        let groups = model.root().children();
        assert_eq!(groups.len(), 2);

        let field = model.get_item_by_id("root/0/App/title").unwrap();
        match field.kind() {
            TreeNode::Element(element) => {
                assert_eq!(element.symbol().kind, SymbolKind::Field);
                assert_eq!(element.symbol().container_name.as_deref(), Some("App"));
                assert_eq!(element.symbol().range.start.line_number, 2);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        let result = OutlineSnapshot::from_json("{ \"groups\": [] }");
        assert!(matches!(result, Err(OutlineError::Snapshot(_))));
    }
}
