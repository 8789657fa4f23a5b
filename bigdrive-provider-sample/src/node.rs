use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub last_modified: DateTime<Utc>,
    pub data: Vec<u8>,
}

impl Node {
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
            children: Vec::new(),
            last_modified: Utc::now(),
            data: Vec::new(),
        }
    }

    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: NodeKind::File,
            data: data.into(),
            ..Self::folder(name)
        }
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name == name)
    }

    /// Resolves a `\`-separated path relative to this node; `\` is the node itself.
    pub fn find(&self, path: &str) -> Option<&Node> {
        segments(path).try_fold(self, |node, name| node.child(name))
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Node> {
        segments(path).try_fold(self, |node, name| {
            node.children.iter_mut().find(|c| c.name == name)
        })
    }

    pub fn names_of(&self, kind: NodeKind) -> Vec<String> {
        self.children
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    /// The tree every sample drive starts out with.
    pub fn sample_tree() -> Node {
        Node::folder("").with_children([
            Node::folder("RootFolder1").with_children([Node::folder("SubFolder1")]),
            Node::folder("RootFolder2").with_children([Node::folder("SubFolder2")]),
            Node::folder("RootFolder3"),
            Node::file("A File.txt", include_bytes!("../resources/A File.txt").as_slice()),
            Node::file(
                "Root File 2.txt",
                include_bytes!("../resources/Root File 2.txt").as_slice(),
            ),
            Node::file("Z File.txt", include_bytes!("../resources/Z File.txt").as_slice()),
        ])
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_nodes() {
        let root = Node::sample_tree();
        assert_eq!(root.find(r"\").map(|n| n.kind), Some(NodeKind::Folder));
        assert_eq!(
            root.find(r"\RootFolder1\SubFolder1").map(|n| n.name.as_str()),
            Some("SubFolder1")
        );
        assert!(root.find(r"\RootFolder1\Missing").is_none());
        assert!(root.find(r"\A File.txt").unwrap().is_file());
    }

    #[test]
    fn names_by_kind_keep_insertion_order() {
        let root = Node::sample_tree();
        assert_eq!(
            root.names_of(NodeKind::Folder),
            ["RootFolder1", "RootFolder2", "RootFolder3"]
        );
        assert_eq!(
            root.names_of(NodeKind::File),
            ["A File.txt", "Root File 2.txt", "Z File.txt"]
        );
    }

    #[test]
    fn file_size_is_the_content_length() {
        let root = Node::sample_tree();
        let file = root.find(r"\Z File.txt").unwrap();
        assert_eq!(file.size(), file.data.len() as u64);
        assert!(file.size() > 0);
    }
}
