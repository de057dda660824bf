//! Frame synchronization example
//!
//! Three frames are grouped so they move as one rigid set. One of them only
//! follows. Edits go through a property binding so they can be undone.

use framekit_core::{RigidTransform, Vector3d};
use framekit_edit::{FrameSyncGroup, TransformPropertyBinding, UndoHistory};

fn print_frames(label: &str, frames: &[(&str, &RigidTransform)]) {
    println!("{}", label);
    for (name, frame) in frames {
        let p = frame.position();
        println!("  {:<9} [{:>7.3}, {:>7.3}, {:>7.3}]", name, p.x, p.y, p.z);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("framekit Frame Sync Example");
    println!("===========================");

    let base = RigidTransform::from_position_rpy_degrees([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
    let tool = RigidTransform::from_position_rpy_degrees([0.5, 0.0, 0.2], [0.0, 90.0, 0.0]);
    let marker = RigidTransform::from_position_rpy_degrees([0.0, 1.0, 0.0], [0.0, 0.0, 0.0]);
    let frames = [("base", &base), ("tool", &tool), ("marker", &marker)];

    let group = FrameSyncGroup::new();
    group.add_member(&base, false);
    group.add_member(&tool, false);
    group.add_member(&marker, true);
    println!("Group has {} members", group.len());

    let history = UndoHistory::new();
    let base_fields = TransformPropertyBinding::new(&base, Some(history.clone()));

    print_frames("initial", &frames);

    base_fields.set_position([1.0, 1.0, 0.0]);
    print_frames("base typed to (1, 1, 0)", &frames);

    base_fields.set_rpy_degrees([0.0, 0.0, 90.0]);
    print_frames("base yawed 90°", &frames);

    // The marker re-anchors itself instead of dragging the others along
    marker.translate_world(&Vector3d::new(0.0, 0.0, 2.0));
    print_frames("marker lifted", &frames);

    {
        let _paused = group.suspend_updates();
        tool.translate_local(&Vector3d::new(0.0, 0.0, 0.1));
    }
    print_frames("tool adjusted while paused", &frames);

    while history.undo() {}
    print_frames("after undoing all base edits", &frames);

    group.remove_member(&marker)?;
    println!("Group has {} members", group.len());
    Ok(())
}
