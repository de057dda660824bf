//! Numeric position / orientation fields bound to a transform
//!
//! The binding keeps a position and a roll/pitch/yaw triple (degrees) in
//! step with one [`RigidTransform`] in both directions, and records every
//! change as an undoable [`TransformEdit`]. Rapid consecutive edits of the
//! same kind merge into one history entry.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use framekit_core::{
    is_finite_pose, pose_from_position_rpy_degrees, position_rpy_degrees, Error, FlagGuard, Pose,
    Result, RigidTransform, SubscriptionToken, SuspendCounter, SuspendGuard, WeakTransform,
};

use crate::clock::{Clock, MonotonicClock};
use crate::history::{UndoCommand, UndoHistory};

/// History text for edits coming from the transform side
pub const TRANSFORM_FRAME_TEXT: &str = "Transform frame";
/// History text for edits of the position fields
pub const UPDATE_POSITION_TEXT: &str = "Update Position";
/// History text for edits of the roll/pitch/yaw fields
pub const UPDATE_RPY_TEXT: &str = "Update RPY (deg)";

/// Merge id shared by all transform edits
const TRANSFORM_EDIT_ID: u32 = 1;

/// Display attributes of one numeric field group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldAttributes {
    pub decimals: u32,
    pub single_step: f64,
}

impl FieldAttributes {
    /// Format a value with the configured number of decimals
    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.decimals as usize, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyBindingConfig {
    /// Edits with the same text closer together than this merge
    pub merge_window_secs: f64,
    pub position: FieldAttributes,
    pub rpy: FieldAttributes,
}

impl Default for PropertyBindingConfig {
    fn default() -> Self {
        Self {
            merge_window_secs: 0.25,
            position: FieldAttributes {
                decimals: 3,
                single_step: 0.01,
            },
            rpy: FieldAttributes {
                decimals: 2,
                single_step: 1.0,
            },
        }
    }
}

impl PropertyBindingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.merge_window_secs.is_finite() && self.merge_window_secs >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "merge window must be a non-negative number of seconds, got {}",
                self.merge_window_secs
            )));
        }
        for (name, attributes) in [("position", &self.position), ("rpy", &self.rpy)] {
            if !(attributes.single_step.is_finite() && attributes.single_step > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{} step must be positive, got {}",
                    name, attributes.single_step
                )));
            }
        }
        Ok(())
    }
}

/// Values shown by a property panel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformFields {
    pub position: [f64; 3],
    pub rpy_degrees: [f64; 3],
}

impl TransformFields {
    pub fn from_pose(pose: &Pose) -> Self {
        let (position, rpy_degrees) = position_rpy_degrees(pose);
        Self {
            position,
            rpy_degrees,
        }
    }

    pub fn to_pose(&self) -> Pose {
        pose_from_position_rpy_degrees(self.position, self.rpy_degrees)
    }

    fn is_finite(&self) -> bool {
        self.position
            .iter()
            .chain(self.rpy_degrees.iter())
            .all(|value| value.is_finite())
    }
}

/// Undoable change of one transform from `before` to `after`
pub struct TransformEdit {
    target: WeakTransform,
    before: Pose,
    after: Pose,
    timestamp: f64,
    text: String,
    merge_window: f64,
    suspend: SuspendCounter,
}

impl TransformEdit {
    pub fn before(&self) -> Pose {
        self.before
    }

    pub fn after(&self) -> Pose {
        self.after
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn apply(&self, pose: Pose) {
        match self.target.upgrade() {
            Some(target) => {
                let _suspended = self.suspend.suspend();
                target.set_pose(pose);
            }
            None => log::debug!("'{}' targets a dropped transform", self.text),
        }
    }
}

impl UndoCommand for TransformEdit {
    fn undo(&mut self) {
        self.apply(self.before);
    }

    fn redo(&mut self) {
        self.apply(self.after);
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn id(&self) -> Option<u32> {
        Some(TRANSFORM_EDIT_ID)
    }

    fn merge_with(&mut self, other: &dyn UndoCommand) -> bool {
        let Some(other) = other.as_any().downcast_ref::<TransformEdit>() else {
            return false;
        };
        let same_target = match other.target.upgrade() {
            Some(target) => self.target.points_to(&target),
            None => false,
        };
        if !same_target || self.text != other.text {
            return false;
        }
        if other.timestamp - self.timestamp > self.merge_window {
            return false;
        }
        self.after = other.after;
        self.timestamp = other.timestamp;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for TransformEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformEdit")
            .field("text", &self.text)
            .field("timestamp", &self.timestamp)
            .field("before", &self.before)
            .field("after", &self.after)
            .finish()
    }
}

struct BindingState {
    transform: RigidTransform,
    fields: Cell<TransformFields>,
    block_signals: Cell<bool>,
    suspend: SuspendCounter,
    last_pose: Cell<Pose>,
    history: Option<UndoHistory>,
    clock: Rc<dyn Clock>,
    config: PropertyBindingConfig,
    token: Cell<Option<SubscriptionToken>>,
}

impl BindingState {
    fn on_transform_modified(&self, transform: &RigidTransform) {
        if self.block_signals.get() {
            return;
        }
        let pose = transform.pose();
        {
            let _blocked = FlagGuard::set(&self.block_signals);
            self.fields.set(TransformFields::from_pose(&pose));
        }
        self.record(pose, TRANSFORM_FRAME_TEXT);
    }

    fn apply_fields(&self, fields: TransformFields, text: &str) -> bool {
        if !fields.is_finite() {
            log::debug!("Ignoring non-finite field values {:?}", fields);
            return false;
        }
        let pose = fields.to_pose();
        if !is_finite_pose(&pose) {
            return false;
        }
        self.fields.set(fields);
        let changed = {
            let _blocked = FlagGuard::set(&self.block_signals);
            self.transform.set_pose(pose)
        };
        if changed {
            self.record(self.transform.pose(), text);
        }
        changed
    }

    /// Remember `pose` as the latest state and push an edit from the
    /// previous one, unless recording is off right now
    fn record(&self, pose: Pose, text: &str) {
        let before = self.last_pose.replace(pose);
        if self.suspend.is_suspended() {
            return;
        }
        let Some(history) = &self.history else {
            return;
        };
        if history.is_applying() {
            return;
        }
        history.push(Box::new(TransformEdit {
            target: self.transform.downgrade(),
            before,
            after: pose,
            timestamp: self.clock.now(),
            text: text.to_string(),
            merge_window: self.config.merge_window_secs,
            suspend: self.suspend.clone(),
        }));
    }
}

/// Two-way binding between numeric fields and a transform
pub struct TransformPropertyBinding {
    state: Rc<BindingState>,
}

impl TransformPropertyBinding {
    pub fn new(transform: &RigidTransform, history: Option<UndoHistory>) -> Self {
        Self::build(
            transform,
            history,
            PropertyBindingConfig::default(),
            Rc::new(MonotonicClock::new()),
        )
    }

    pub fn with_config(
        transform: &RigidTransform,
        history: Option<UndoHistory>,
        config: PropertyBindingConfig,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(transform, history, config, clock))
    }

    fn build(
        transform: &RigidTransform,
        history: Option<UndoHistory>,
        config: PropertyBindingConfig,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let pose = transform.pose();
        let state = Rc::new(BindingState {
            transform: transform.clone(),
            fields: Cell::new(TransformFields::from_pose(&pose)),
            block_signals: Cell::new(false),
            suspend: SuspendCounter::new(),
            last_pose: Cell::new(pose),
            history,
            clock,
            config,
            token: Cell::new(None),
        });

        let weak_state = Rc::downgrade(&state);
        let token = transform.connect(move |modified| {
            if let Some(state) = weak_state.upgrade() {
                state.on_transform_modified(modified);
            }
        });
        state.token.set(Some(token));

        Self { state }
    }

    pub fn transform(&self) -> &RigidTransform {
        &self.state.transform
    }

    pub fn history(&self) -> Option<&UndoHistory> {
        self.state.history.as_ref()
    }

    pub fn config(&self) -> &PropertyBindingConfig {
        &self.state.config
    }

    pub fn fields(&self) -> TransformFields {
        self.state.fields.get()
    }

    pub fn position(&self) -> [f64; 3] {
        self.state.fields.get().position
    }

    pub fn rpy_degrees(&self) -> [f64; 3] {
        self.state.fields.get().rpy_degrees
    }

    pub fn position_attributes(&self) -> FieldAttributes {
        self.state.config.position
    }

    pub fn rpy_attributes(&self) -> FieldAttributes {
        self.state.config.rpy
    }

    /// Move the transform to new position field values
    ///
    /// Returns whether the transform changed.
    pub fn set_position(&self, position: [f64; 3]) -> bool {
        let fields = TransformFields {
            position,
            ..self.fields()
        };
        self.state.apply_fields(fields, UPDATE_POSITION_TEXT)
    }

    /// Rotate the transform to new roll/pitch/yaw field values
    pub fn set_rpy_degrees(&self, rpy_degrees: [f64; 3]) -> bool {
        let fields = TransformFields {
            rpy_degrees,
            ..self.fields()
        };
        self.state.apply_fields(fields, UPDATE_RPY_TEXT)
    }

    /// Replace both field groups at once, recorded as one frame edit
    pub fn set_fields(&self, fields: TransformFields) -> bool {
        self.state.apply_fields(fields, TRANSFORM_FRAME_TEXT)
    }

    /// Stop recording history while the guard is alive
    ///
    /// Fields keep following the transform.
    #[must_use = "recording resumes when the guard is dropped"]
    pub fn suspend_updates(&self) -> SuspendGuard {
        self.state.suspend.suspend()
    }

    pub fn is_suspended(&self) -> bool {
        self.state.suspend.is_suspended()
    }
}

impl Drop for TransformPropertyBinding {
    fn drop(&mut self) {
        if let Some(token) = self.state.token.take() {
            self.state.transform.disconnect(token);
        }
    }
}

impl fmt::Debug for TransformPropertyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPropertyBinding")
            .field("fields", &self.fields())
            .field("suspended", &self.is_suspended())
            .field("has_history", &self.state.history.is_some())
            .finish()
    }
}
