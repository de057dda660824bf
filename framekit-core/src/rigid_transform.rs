//! Shared, observable rigid transform
//!
//! A [`RigidTransform`] is the single source of truth for "where is this
//! frame". Manipulators, camera tools, synchronization groups and property
//! bindings all hold handles to the same transform and learn about changes
//! through its modified notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use nalgebra::UnitQuaternion;

use crate::geometry::{Point3d, Vector3d};
use crate::suspend::FlagGuard;
use crate::transform::{
    is_finite_pose, pose_from_position_rpy_degrees, pose_origin, renormalized,
    rotation_about_point, translation_pose, Axis, Pose,
};

/// Callback invoked after the transform changed
pub type ModifiedCallback = Rc<dyn Fn(&RigidTransform)>;

/// Opaque handle identifying one subscription on one transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

struct TransformState {
    pose: Cell<Pose>,
    subscribers: RefCell<Vec<(SubscriptionToken, ModifiedCallback)>>,
    next_token: Cell<u64>,
    notifying: Cell<bool>,
}

/// A mutable position and orientation with change notification
///
/// Cloning yields another handle to the same transform. Subscribers are
/// called after every mutation that changes the pose. A subscriber that
/// mutates the transform from inside its own callback updates the pose but
/// does not start a nested notification pass.
#[derive(Clone)]
pub struct RigidTransform {
    state: Rc<TransformState>,
}

impl RigidTransform {
    /// Create a transform with the given pose
    pub fn new(pose: Pose) -> Self {
        Self {
            state: Rc::new(TransformState {
                pose: Cell::new(renormalized(&pose)),
                subscribers: RefCell::new(Vec::new()),
                next_token: Cell::new(0),
                notifying: Cell::new(false),
            }),
        }
    }

    /// Create an identity transform
    pub fn identity() -> Self {
        Self::new(Pose::identity())
    }

    /// Create a transform from a position and roll/pitch/yaw in degrees
    pub fn from_position_rpy_degrees(position: [f64; 3], rpy_degrees: [f64; 3]) -> Self {
        Self::new(pose_from_position_rpy_degrees(position, rpy_degrees))
    }

    /// Snapshot of the current pose
    pub fn pose(&self) -> Pose {
        self.state.pose.get()
    }

    /// World-space origin of the frame
    pub fn position(&self) -> Point3d {
        pose_origin(&self.pose())
    }

    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.pose().rotation
    }

    /// A local axis expressed in world space
    pub fn world_axis(&self, axis: Axis) -> Vector3d {
        self.pose().rotation * axis.unit()
    }

    /// Replace the pose
    ///
    /// Non-finite poses are rejected. Returns whether the pose changed (and
    /// therefore whether subscribers were notified).
    pub fn set_pose(&self, pose: Pose) -> bool {
        if !is_finite_pose(&pose) {
            log::trace!("rejecting non-finite pose");
            return false;
        }
        let current = self.state.pose.get();
        if pose == current {
            return false;
        }
        let pose = renormalized(&pose);
        if pose == current {
            return false;
        }
        self.state.pose.set(pose);
        self.notify();
        true
    }

    /// Concatenate `local` on the right: the change is expressed in the
    /// frame's own coordinates
    pub fn pre_multiply(&self, local: &Pose) -> bool {
        self.set_pose(self.pose() * local)
    }

    /// Concatenate `world` on the left: the change is expressed in world
    /// coordinates
    pub fn post_multiply(&self, world: &Pose) -> bool {
        self.set_pose(world * self.pose())
    }

    /// Move the frame by a world-space offset
    pub fn translate_world(&self, delta: &Vector3d) -> bool {
        self.post_multiply(&translation_pose(delta))
    }

    /// Move the frame by an offset along its own axes
    pub fn translate_local(&self, delta: &Vector3d) -> bool {
        self.pre_multiply(&translation_pose(delta))
    }

    /// Rotate by `angle` radians about a world-space axis through `center`
    pub fn rotate_about_point(&self, center: &Point3d, axis: &Vector3d, angle: f64) -> bool {
        match rotation_about_point(center, axis, angle) {
            Some(rotation) => self.post_multiply(&rotation),
            None => false,
        }
    }

    /// Register a callback for modifications
    pub fn connect<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(&RigidTransform) + 'static,
    {
        let token = SubscriptionToken(self.state.next_token.get());
        self.state.next_token.set(token.0 + 1);
        self.state
            .subscribers
            .borrow_mut()
            .push((token, Rc::new(callback)));
        token
    }

    /// Remove a callback; returns whether the token was connected
    pub fn disconnect(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = self.state.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(t, _)| *t != token);
        subscribers.len() != before
    }

    pub fn is_connected(&self, token: SubscriptionToken) -> bool {
        self.state
            .subscribers
            .borrow()
            .iter()
            .any(|(t, _)| *t == token)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.borrow().len()
    }

    /// Whether a notification pass is running right now
    pub fn is_notifying(&self) -> bool {
        self.state.notifying.get()
    }

    /// Whether both handles refer to the same transform
    pub fn same_as(&self, other: &RigidTransform) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// A handle that does not keep the transform alive
    pub fn downgrade(&self) -> WeakTransform {
        WeakTransform {
            state: Rc::downgrade(&self.state),
        }
    }

    fn notify(&self) {
        if self.state.notifying.get() {
            log::trace!("transform modified during its own notification; not re-notifying");
            return;
        }
        let _notifying = FlagGuard::set(&self.state.notifying);

        // Callbacks may connect or disconnect while we iterate
        let callbacks: Vec<(SubscriptionToken, ModifiedCallback)> = self
            .state
            .subscribers
            .borrow()
            .iter()
            .map(|(token, cb)| (*token, Rc::clone(cb)))
            .collect();

        for (token, callback) in callbacks {
            if self.is_connected(token) {
                callback(self);
            }
        }
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for RigidTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigidTransform")
            .field("pose", &self.pose())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl From<Pose> for RigidTransform {
    fn from(pose: Pose) -> Self {
        Self::new(pose)
    }
}

/// Non-owning handle to a [`RigidTransform`]
#[derive(Clone, Default)]
pub struct WeakTransform {
    state: Weak<TransformState>,
}

impl WeakTransform {
    pub fn upgrade(&self) -> Option<RigidTransform> {
        self.state.upgrade().map(|state| RigidTransform { state })
    }

    /// Whether the transform has been dropped
    pub fn is_dead(&self) -> bool {
        self.state.strong_count() == 0
    }

    /// Whether this handle refers to `transform`
    pub fn points_to(&self, transform: &RigidTransform) -> bool {
        std::ptr::eq(self.state.as_ptr(), Rc::as_ptr(&transform.state))
    }
}

impl fmt::Debug for WeakTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakTransform")
            .field("alive", &!self.is_dead())
            .finish()
    }
}
