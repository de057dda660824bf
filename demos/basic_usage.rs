//! Basic usage example for framekit
//!
//! This example demonstrates fundamental operations:
//! - Creating and observing a rigid transform
//! - Editing it through numeric fields
//! - Undoing and redoing the edits

use framekit_core::{RigidTransform, Vector3d};
use framekit_edit::{TransformPropertyBinding, UndoHistory};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("framekit Basic Usage Example");
    println!("============================");

    let frame = RigidTransform::from_position_rpy_degrees([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
    frame.connect(|t| log::info!("frame moved to {:?}", t.position()));

    let history = UndoHistory::new();
    let fields = TransformPropertyBinding::new(&frame, Some(history.clone()));
    let position_fmt = fields.position_attributes();
    let rpy_fmt = fields.rpy_attributes();

    let print_fields = |label: &str| {
        let p = fields.position();
        let r = fields.rpy_degrees();
        println!(
            "{:<12} position = [{}, {}, {}]  rpy = [{}, {}, {}]",
            label,
            position_fmt.format(p[0]),
            position_fmt.format(p[1]),
            position_fmt.format(p[2]),
            rpy_fmt.format(r[0]),
            rpy_fmt.format(r[1]),
            rpy_fmt.format(r[2]),
        );
    };

    print_fields("initial");

    fields.set_position([1.0, 2.0, 0.5]);
    print_fields("typed");

    fields.set_rpy_degrees([0.0, 0.0, 45.0]);
    print_fields("rotated");

    // Moving the transform directly refreshes the fields
    frame.translate_local(&Vector3d::new(1.0, 0.0, 0.0));
    print_fields("nudged");

    println!("\nHistory has {} entries", history.len());
    while let Some(text) = history.undo_text() {
        history.undo();
        println!("undo '{}'", text);
        print_fields("  ->");
    }

    if let Some(text) = history.redo_text() {
        history.redo();
        println!("redo '{}'", text);
        print_fields("  ->");
    }

    Ok(())
}
