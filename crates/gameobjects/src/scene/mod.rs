//! Scene module
//!
//! The scene is the node tree game objects are attached to. It owns node
//! storage; game objects refer to their node by [`NodeId`].

pub mod scene_graph;

pub use scene_graph::{Node, NodeId, NodeUserData, Scene};
