//! scenecast - build a 3D scene from code and mirror it live to browser viewers
//!
//! Entities in [`geometry`] lower to three.js object documents, [`commands`]
//! wrap them for the wire and [`visualizer`] sends them to a running
//! `scenecast-server`, which keeps the scene and relays it to every viewer.

pub mod animation;
pub mod commands;
pub mod core;
pub mod geometry;
pub mod visualizer;

pub use animation::{Animation, AnimationClip, AnimationTrack};
pub use commands::{Command, ObjectSource};
pub use crate::core::{Error, Result};
pub use scenecast_bridge::Path;
pub use visualizer::{ViewerWindow, Visualizer};
