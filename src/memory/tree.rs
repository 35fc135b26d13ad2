//! A resource tree (and inbox sink) that lives in memory, and can be persisted to a JSON file

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collection::ResourceType;
use crate::mock_behaviour::MockBehaviour;
use crate::resource::DavPath;
use crate::traits::{DavTree, DepositError, InboxSink};

/// A node of the tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Collection(ResourceType),
    /// A calendar object, and its iCalendar content
    Object(String),
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct TreeData {
    nodes: BTreeMap<DavPath, Node>,
}

/// A resource tree stored in memory
#[derive(Debug, Default)]
pub struct MemoryTree {
    data: Mutex<TreeData>,
    mock_behaviour: Mutex<MockBehaviour>,
}

impl MemoryTree {
    /// An empty tree, with only a root collection
    pub fn new() -> Self {
        let tree = Self::default();
        tree.data().nodes.insert(DavPath::new(""), Node::Collection(ResourceType::COLLECTION));
        tree
    }

    /// Initialize a tree from the content of a valid JSON file.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let data: TreeData = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };

        let tree = Self {
            data: Mutex::new(data),
            mock_behaviour: Mutex::new(MockBehaviour::default()),
        };
        tree.data().nodes.entry(DavPath::new("")).or_insert(Node::Collection(ResourceType::COLLECTION));
        Ok(tree)
    }

    /// Store the current tree into a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let file = match std::fs::File::create(path) {
            Err(err) => {
                return Err(format!("Unable to save file {:?}: {}", path, err).into());
            },
            Ok(f) => f,
        };
        serde_json::to_writer_pretty(file, &*self.data())?;
        Ok(())
    }

    /// Change the behaviour of this tree for the next calls
    pub fn set_mock_behaviour(&self, behaviour: MockBehaviour) {
        *self.mock_behaviour.lock().unwrap_or_else(PoisonError::into_inner) = behaviour;
    }

    /// Add a collection. Missing parents are created as plain collections
    pub fn add_collection<P: Into<DavPath>>(&self, path: P, resource_type: ResourceType) {
        let path = path.into();
        let mut data = self.data();
        let mut parent = path.parent();
        while let Some(p) = parent {
            parent = p.parent();
            data.nodes.entry(p).or_insert(Node::Collection(ResourceType::COLLECTION));
        }
        data.nodes.insert(path, Node::Collection(resource_type | ResourceType::COLLECTION));
    }

    /// Create or replace an object, without going through any scheduling hook
    pub fn put_object<P: Into<DavPath>>(&self, path: P, content: &str) -> Result<(), Box<dyn Error>> {
        let path = path.into();
        let mut data = self.data();
        let parent = path.parent().ok_or("The root cannot be an object")?;
        match data.nodes.get(&parent) {
            Some(Node::Collection(_)) => (),
            _ => return Err(format!("{} is not a collection", parent).into()),
        }
        if let Some(Node::Collection(_)) = data.nodes.get(&path) {
            return Err(format!("{} is a collection", path).into());
        }
        data.nodes.insert(path, Node::Object(content.to_string()));
        Ok(())
    }

    /// Remove a node, and everything below it. Returns whether something was removed
    pub fn delete<P: Into<DavPath>>(&self, path: P) -> bool {
        let path = path.into();
        let mut data = self.data();
        let prefix = format!("{}/", path.as_str());
        let before = data.nodes.len();
        data.nodes.retain(|p, _| p != &path && p.as_str().starts_with(&prefix) == false);
        data.nodes.len() != before
    }

    pub fn node(&self, path: &DavPath) -> Option<Node> {
        self.data().nodes.get(path).cloned()
    }

    /// The content of an object
    pub fn object<P: Into<DavPath>>(&self, path: P) -> Option<String> {
        match self.data().nodes.get(&path.into()) {
            Some(Node::Object(content)) => Some(content.clone()),
            _ => None,
        }
    }

    /// The direct children of a collection, in name order
    pub fn children<P: Into<DavPath>>(&self, path: P) -> Vec<DavPath> {
        let path = path.into();
        self.data().nodes.keys()
            .filter(|p| p.parent().as_ref() == Some(&path))
            .cloned()
            .collect()
    }

    fn data(&self) -> MutexGuard<'_, TreeData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mock_behaviour(&self) -> MutexGuard<'_, MockBehaviour> {
        self.mock_behaviour.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DavTree for MemoryTree {
    async fn resource_type(&self, path: &DavPath) -> Option<ResourceType> {
        match self.data().nodes.get(path) {
            None => None,
            Some(Node::Collection(t)) => Some(*t),
            Some(Node::Object(_)) => Some(ResourceType::empty()),
        }
    }

    async fn get_object(&self, path: &DavPath) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        self.mock_behaviour().can_get_object()?;

        match self.data().nodes.get(path) {
            None => Ok(None),
            Some(Node::Object(content)) => Ok(Some(content.clone())),
            Some(Node::Collection(_)) => Err(format!("{} is a collection", path).into()),
        }
    }
}

#[async_trait]
impl InboxSink for MemoryTree {
    async fn deposit(&self, collection: &DavPath, name: &str, data: &str) -> Result<(), DepositError> {
        {
            let mut mock = self.mock_behaviour();
            if mock.is_name_free().is_err() {
                return Err(DepositError::AlreadyExists);
            }
            mock.can_deposit().map_err(DepositError::Failed)?;
        }

        let mut tree = self.data();
        match tree.nodes.get(collection) {
            Some(Node::Collection(_)) => (),
            _ => return Err(DepositError::Failed(format!("{} is not a collection", collection).into())),
        }
        let path = collection.join(name);
        if tree.nodes.contains_key(&path) {
            return Err(DepositError::AlreadyExists);
        }
        log::debug!("Storing {}", path);
        tree.nodes.insert(path, Node::Object(data.to_string()));
        Ok(())
    }
}
