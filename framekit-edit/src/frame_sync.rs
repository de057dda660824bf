//! Groups of transforms that move as one rigid set
//!
//! Every member keeps a base pose. The group as a whole sits at
//! `G = M · base_M⁻¹` for any member `M`; when one member moves, all others
//! are set to `G · base_F` so their offsets relative to each other survive.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use framekit_core::{
    Error, FlagGuard, Pose, Result, RigidTransform, SubscriptionToken, SuspendCounter,
    SuspendGuard, WeakTransform,
};

struct SyncMember {
    transform: WeakTransform,
    base: Pose,
    token: SubscriptionToken,
    ignore_incoming: bool,
}

#[derive(Default)]
struct SyncState {
    members: RefCell<Vec<SyncMember>>,
    /// Set while the group itself is moving members
    propagating: Cell<bool>,
    suspend: SuspendCounter,
}

/// Keeps several transforms moving together
///
/// The group holds members weakly; dropped transforms are pruned the next
/// time the group walks its members. Dropping the group disconnects it from
/// every live member.
pub struct FrameSyncGroup {
    state: Rc<SyncState>,
}

impl FrameSyncGroup {
    pub fn new() -> Self {
        Self {
            state: Rc::new(SyncState::default()),
        }
    }

    /// Add a transform to the group
    ///
    /// With `ignore_incoming` set, moving this member does not move the
    /// others; it only re-anchors the member at its new offset. It still
    /// follows when other members move. Returns false if the transform
    /// already was a member.
    pub fn add_member(&self, transform: &RigidTransform, ignore_incoming: bool) -> bool {
        if self.contains(transform) {
            return false;
        }

        let base = {
            let mut members = self.state.members.borrow_mut();
            prune(&mut members);
            base_for(&members, transform)
        };

        let weak_state = Rc::downgrade(&self.state);
        let token = transform.connect(move |modified| {
            if let Some(state) = weak_state.upgrade() {
                on_member_modified(&state, modified);
            }
        });

        self.state.members.borrow_mut().push(SyncMember {
            transform: transform.downgrade(),
            base,
            token,
            ignore_incoming,
        });
        log::debug!(
            "Added transform to sync group ({} members)",
            self.state.members.borrow().len()
        );
        true
    }

    /// Remove a transform from the group and disconnect from it
    pub fn remove_member(&self, transform: &RigidTransform) -> Result<()> {
        let removed = {
            let mut members = self.state.members.borrow_mut();
            let position = members
                .iter()
                .position(|member| member.transform.points_to(transform))
                .ok_or(Error::NotAMember)?;
            members.remove(position)
        };
        transform.disconnect(removed.token);
        Ok(())
    }

    pub fn contains(&self, transform: &RigidTransform) -> bool {
        self.state
            .members
            .borrow()
            .iter()
            .any(|member| member.transform.points_to(transform))
    }

    /// Number of live members
    pub fn len(&self) -> usize {
        let mut members = self.state.members.borrow_mut();
        prune(&mut members);
        members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live members in insertion order
    pub fn members(&self) -> Vec<RigidTransform> {
        self.state
            .members
            .borrow()
            .iter()
            .filter_map(|member| member.transform.upgrade())
            .collect()
    }

    /// Base pose of a member
    pub fn member_base(&self, transform: &RigidTransform) -> Option<Pose> {
        self.state
            .members
            .borrow()
            .iter()
            .find(|member| member.transform.points_to(transform))
            .map(|member| member.base)
    }

    /// Stop propagating while the guard is alive
    ///
    /// Members moved meanwhile are re-anchored at their new offsets.
    #[must_use = "updates resume when the guard is dropped"]
    pub fn suspend_updates(&self) -> SuspendGuard {
        self.state.suspend.suspend()
    }

    pub fn is_suspended(&self) -> bool {
        self.state.suspend.is_suspended()
    }
}

impl Default for FrameSyncGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameSyncGroup {
    fn drop(&mut self) {
        let members = std::mem::take(&mut *self.state.members.borrow_mut());
        for member in members {
            if let Some(transform) = member.transform.upgrade() {
                transform.disconnect(member.token);
            }
        }
    }
}

impl fmt::Debug for FrameSyncGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSyncGroup")
            .field("members", &self.state.members.borrow().len())
            .field("suspended", &self.is_suspended())
            .finish()
    }
}

fn prune(members: &mut Vec<SyncMember>) {
    let before = members.len();
    members.retain(|member| !member.transform.is_dead());
    if members.len() != before {
        log::trace!("Pruned {} dropped sync members", before - members.len());
    }
}

/// Base pose for `transform` given the other members
///
/// The anchor is the first live member that propagates, or failing that any
/// live member. The result satisfies `R⁻¹ · T == base_R⁻¹ · base_T`.
fn base_for(members: &[SyncMember], transform: &RigidTransform) -> Pose {
    let others = || {
        members
            .iter()
            .filter(|member| !member.transform.points_to(transform))
            .filter_map(|member| member.transform.upgrade().map(|live| (member, live)))
    };
    let anchor = others()
        .find(|(member, _)| !member.ignore_incoming)
        .or_else(|| others().next());

    match anchor {
        Some((member, anchor)) => member.base * anchor.pose().inverse() * transform.pose(),
        None => transform.pose(),
    }
}

fn on_member_modified(state: &SyncState, modified: &RigidTransform) {
    if state.propagating.get() {
        return;
    }

    let targets: Vec<(RigidTransform, Pose)> = {
        let mut members = state.members.borrow_mut();
        prune(&mut members);
        let Some(index) = members
            .iter()
            .position(|member| member.transform.points_to(modified))
        else {
            return;
        };

        if members[index].ignore_incoming || state.suspend.is_suspended() {
            let base = base_for(&members, modified);
            members[index].base = base;
            return;
        }

        let group_pose = modified.pose() * members[index].base.inverse();
        members
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .filter_map(|(_, member)| {
                member
                    .transform
                    .upgrade()
                    .map(|transform| (transform, group_pose * member.base))
            })
            .collect()
    };

    let _propagating = FlagGuard::set(&state.propagating);
    for (transform, pose) in targets {
        transform.set_pose(pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use framekit_core::{pose_from_position_rpy_degrees, Vector3d};

    fn assert_pose_eq(actual: &Pose, expected: &Pose) {
        assert_relative_eq!(
            actual.translation.vector,
            expected.translation.vector,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            actual.rotation.angle_to(&expected.rotation),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_first_member_uses_its_own_pose_as_base() {
        let group = FrameSyncGroup::new();
        let a = RigidTransform::from_position_rpy_degrees([1.0, 2.0, 3.0], [0.0, 0.0, 30.0]);
        assert!(group.add_member(&a, false));
        assert!(!group.add_member(&a, false));
        assert_pose_eq(&group.member_base(&a).unwrap(), &a.pose());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_moving_one_member_moves_the_other() {
        let group = FrameSyncGroup::new();
        let a = RigidTransform::from_position_rpy_degrees([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        let b = RigidTransform::from_position_rpy_degrees([1.0, 0.0, 0.0], [0.0, 0.0, 90.0]);
        group.add_member(&a, false);
        group.add_member(&b, false);

        a.translate_world(&Vector3d::new(0.0, 2.0, 0.0));
        assert_relative_eq!(b.position().coords, Vector3d::new(1.0, 2.0, 0.0), epsilon = 1e-12);

        let before_offset = a.pose().inverse() * b.pose();
        b.rotate_about_point(&b.position(), &Vector3d::z(), 0.5);
        let after_offset = a.pose().inverse() * b.pose();
        assert_pose_eq(&after_offset, &before_offset);
    }

    #[test]
    fn test_remove_non_member_fails() {
        let group = FrameSyncGroup::new();
        let a = RigidTransform::identity();
        assert_eq!(group.remove_member(&a), Err(Error::NotAMember));
        group.add_member(&a, false);
        assert_eq!(group.remove_member(&a), Ok(()));
        assert_eq!(a.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_disconnects_members() {
        let a = RigidTransform::identity();
        {
            let group = FrameSyncGroup::new();
            group.add_member(&a, false);
            assert_eq!(a.subscriber_count(), 1);
        }
        assert_eq!(a.subscriber_count(), 0);
    }

    #[test]
    fn test_late_member_keeps_offset_after_group_moved() {
        let group = FrameSyncGroup::new();
        let a = RigidTransform::new(pose_from_position_rpy_degrees([0.0; 3], [0.0, 0.0, 0.0]));
        group.add_member(&a, false);
        a.set_pose(pose_from_position_rpy_degrees([1.0, 0.0, 0.0], [0.0, 0.0, 90.0]));

        let c = RigidTransform::from_position_rpy_degrees([3.0, 1.0, 0.0], [10.0, 0.0, 0.0]);
        group.add_member(&c, false);
        let offset = a.pose().inverse() * c.pose();

        a.rotate_about_point(&a.position(), &Vector3d::x(), 0.3);
        assert_pose_eq(&(a.pose().inverse() * c.pose()), &offset);
    }
}
