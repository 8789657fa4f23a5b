use super::{same_name, RegistryPath, RegistryStore, RegistryValue};
use crate::error::{HiveError, HiveResult};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct KeyNode {
    name: String,
    values: Vec<(String, RegistryValue)>,
    children: Vec<KeyNode>,
}

impl KeyNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn child(&self, name: &str) -> Option<&KeyNode> {
        self.children.iter().find(|c| same_name(&c.name, name))
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut KeyNode> {
        self.children.iter_mut().find(|c| same_name(&c.name, name))
    }

    fn find(&self, path: &RegistryPath) -> Option<&KeyNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    fn find_mut(&mut self, path: &RegistryPath) -> Option<&mut KeyNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child_mut(segment))
    }

    fn create(&mut self, path: &RegistryPath) -> &mut KeyNode {
        let mut node = self;
        for segment in path.segments() {
            let index = match node.children.iter().position(|c| same_name(&c.name, segment)) {
                Some(index) => index,
                None => {
                    node.children.push(KeyNode::named(segment));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node
    }
}

/// Volatile hive kept entirely in memory. Subkeys enumerate in creation order.
#[derive(Debug, Default)]
pub struct MemoryHive {
    root: RwLock<KeyNode>,
}

impl MemoryHive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryHive {
    fn key_exists(&self, path: &RegistryPath) -> HiveResult<bool> {
        let root = self.root.read().map_err(|_| HiveError::Poisoned)?;
        Ok(root.find(path).is_some())
    }

    fn create_key(&self, path: &RegistryPath) -> HiveResult<()> {
        let mut root = self.root.write().map_err(|_| HiveError::Poisoned)?;
        root.create(path);
        Ok(())
    }

    fn delete_key_tree(&self, path: &RegistryPath) -> HiveResult<()> {
        let mut root = self.root.write().map_err(|_| HiveError::Poisoned)?;
        let parent = match path.parent() {
            Some(parent_path) => root.find_mut(&parent_path),
            None => Some(&mut *root),
        };
        if let Some(parent) = parent {
            parent.children.retain(|c| !same_name(&c.name, path.name()));
        }
        Ok(())
    }

    fn subkey_names(&self, path: &RegistryPath) -> HiveResult<Option<Vec<String>>> {
        let root = self.root.read().map_err(|_| HiveError::Poisoned)?;
        Ok(root
            .find(path)
            .map(|node| node.children.iter().map(|c| c.name.clone()).collect()))
    }

    fn value_names(&self, path: &RegistryPath) -> HiveResult<Option<Vec<String>>> {
        let root = self.root.read().map_err(|_| HiveError::Poisoned)?;
        Ok(root
            .find(path)
            .map(|node| node.values.iter().map(|(name, _)| name.clone()).collect()))
    }

    fn get_value(&self, path: &RegistryPath, name: &str) -> HiveResult<Option<RegistryValue>> {
        let root = self.root.read().map_err(|_| HiveError::Poisoned)?;
        Ok(root.find(path).and_then(|node| {
            node.values
                .iter()
                .find(|(n, _)| same_name(n, name))
                .map(|(_, value)| value.clone())
        }))
    }

    fn set_value(&self, path: &RegistryPath, name: &str, value: RegistryValue) -> HiveResult<()> {
        let mut root = self.root.write().map_err(|_| HiveError::Poisoned)?;
        let node = root
            .find_mut(path)
            .ok_or_else(|| HiveError::KeyNotFound(path.to_string()))?;
        match node.values.iter_mut().find(|(n, _)| same_name(n, name)) {
            Some(entry) => entry.1 = value,
            None => node.values.push((name.to_string(), value)),
        }
        Ok(())
    }
}
