//! Keyframe animations
//!
//! An [`Animation`] holds one clip per scene path. Keys are recorded through a
//! frame view:
//! ```ignore
//! let mut anim = Animation::default();
//! anim.at_frame(vis.path().clone(), 0).at("box").set_transform(&DMat4::IDENTITY);
//! anim.at_frame(vis.path().clone(), 30).at("box").set_transform(&moved);
//! vis.set_animation(&anim, true, 1)?;
//! ```

use glam::DMat4;
use rmpv::Value;
use scenecast_bridge::Path;

use crate::geometry::document::map;

/// A single keyed value
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    pub frame: u32,
    pub value: Value,
}

/// Keyframes of one property, sorted by frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTrack {
    pub name: String,
    /// three.js track type, e.g. `vector3`, `quaternion`, `number`
    pub jstype: String,
    keys: Vec<Keyframe>,
}

impl AnimationTrack {
    pub fn new(name: impl Into<String>, jstype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jstype: jstype.into(),
            keys: Vec::new(),
        }
    }

    /// Insert a key, after any existing keys at the same frame.
    pub fn set_property(&mut self, frame: u32, value: Value) {
        let pos = self.keys.partition_point(|k| k.frame <= frame);
        self.keys.insert(pos, Keyframe { frame, value });
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn lower(&self) -> Value {
        let keys = self
            .keys
            .iter()
            .map(|k| map([("time", Value::from(k.frame)), ("value", k.value.clone())]))
            .collect();
        map([
            ("name", Value::from(format!(".{}", self.name))),
            ("type", Value::from(self.jstype.as_str())),
            ("keys", Value::Array(keys)),
        ])
    }
}

/// Tracks for one object, in the order they were first keyed.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub tracks: Vec<AnimationTrack>,
    pub fps: u32,
    pub name: String,
}

impl AnimationClip {
    pub fn new(fps: u32) -> Self {
        Self {
            tracks: Vec::new(),
            fps,
            name: "default".to_string(),
        }
    }

    pub fn track(&self, property: &str) -> Option<&AnimationTrack> {
        self.tracks.iter().find(|t| t.name == property)
    }

    pub fn set_property(&mut self, frame: u32, property: &str, jstype: &str, value: Value) {
        let index = match self.tracks.iter().position(|t| t.name == property) {
            Some(i) => i,
            None => {
                self.tracks.push(AnimationTrack::new(property, jstype));
                self.tracks.len() - 1
            }
        };
        self.tracks[index].set_property(frame, value);
    }

    pub fn lower(&self) -> Value {
        map([
            ("fps", Value::from(self.fps)),
            ("name", Value::from(self.name.as_str())),
            ("tracks", Value::Array(self.tracks.iter().map(AnimationTrack::lower).collect())),
        ])
    }
}

impl Default for AnimationClip {
    fn default() -> Self {
        Self::new(30)
    }
}

/// Clips keyed by the path of the object they animate.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    clips: Vec<(Path, AnimationClip)>,
    pub default_framerate: u32,
}

impl Animation {
    pub fn new(default_framerate: u32) -> Self {
        Self {
            clips: Vec::new(),
            default_framerate,
        }
    }

    pub fn clip(&self, path: &Path) -> Option<&AnimationClip> {
        self.clips.iter().find(|(p, _)| p == path).map(|(_, c)| c)
    }

    pub fn clips(&self) -> impl Iterator<Item = (&Path, &AnimationClip)> {
        self.clips.iter().map(|(p, c)| (p, c))
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    fn clip_mut(&mut self, path: &Path) -> &mut AnimationClip {
        let index = match self.clips.iter().position(|(p, _)| p == path) {
            Some(i) => i,
            None => {
                self.clips.push((path.clone(), AnimationClip::new(self.default_framerate)));
                self.clips.len() - 1
            }
        };
        &mut self.clips[index].1
    }

    /// Record keys for `path` at `frame`.
    pub fn at_frame(&mut self, path: Path, frame: u32) -> AnimationFrame<'_> {
        AnimationFrame {
            animation: self,
            path,
            frame,
        }
    }

    /// `[{path, clip}]`
    pub fn lower(&self) -> Value {
        Value::Array(
            self.clips
                .iter()
                .map(|(path, clip)| map([("path", Value::from(path.lower())), ("clip", clip.lower())]))
                .collect(),
        )
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new(30)
    }
}

/// Key recorder for one path at one frame
pub struct AnimationFrame<'a> {
    animation: &'a mut Animation,
    path: Path,
    frame: u32,
}

impl AnimationFrame<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// View of a child path at the same frame.
    pub fn at(&mut self, name: &str) -> AnimationFrame<'_> {
        AnimationFrame {
            path: self.path.append(name),
            frame: self.frame,
            animation: &mut *self.animation,
        }
    }

    /// Key `position` and `quaternion` from a rigid transform.
    pub fn set_transform(&mut self, matrix: &DMat4) {
        let (_, rotation, translation) = matrix.to_scale_rotation_translation();
        let position = Value::Array(translation.to_array().iter().map(|&x| Value::from(x)).collect());
        let quaternion = Value::Array(rotation.to_array().iter().map(|&x| Value::from(x)).collect());
        self.set_property("position", "vector3", position);
        self.set_property("quaternion", "quaternion", quaternion);
    }

    pub fn set_property(&mut self, property: &str, jstype: &str, value: impl Into<Value>) {
        let frame = self.frame;
        self.animation
            .clip_mut(&self.path)
            .set_property(frame, property, jstype, value.into());
    }
}
