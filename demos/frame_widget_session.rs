//! Scripted frame widget session
//!
//! Drives the six-handle frame widget and the terrain camera through a
//! headless viewport with a fixed sequence of pointer and key events, the
//! way a windowing backend would feed them.

use std::rc::Rc;

use anyhow::Context;
use framekit_core::{Point2, Point3d, RigidTransform};
use framekit_interact::{
    Camera, FrameWidgetConfig, InputEvent, InputRouter, InteractionHandler, InteractiveFrameWidget,
    Key, KeyEvent, Modifiers, PointerButton, PointerEvent, ProjectedViewport, ScreenPoint,
    TerrainCameraController, Viewport,
};

fn screen_of(view: &ProjectedViewport, p: Point3d) -> anyhow::Result<ScreenPoint> {
    let d = view
        .world_to_display(&p)
        .context("point is not visible from the camera")?;
    Ok(ScreenPoint::from_display(&Point2::new(d.x, d.y), view.height()))
}

fn moved(at: ScreenPoint) -> InputEvent {
    InputEvent::PointerMove(PointerEvent::new(at, None, Modifiers::NONE))
}

fn pressed(at: ScreenPoint) -> InputEvent {
    InputEvent::PointerDown(PointerEvent::new(at, Some(PointerButton::Left), Modifiers::NONE))
}

fn released(at: ScreenPoint) -> InputEvent {
    InputEvent::PointerUp(PointerEvent::new(at, Some(PointerButton::Left), Modifiers::NONE))
}

fn key(key: Key, modifiers: Modifiers) -> InputEvent {
    InputEvent::KeyDown(KeyEvent::new(key, modifiers))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    println!("framekit Frame Widget Session");
    println!("=============================");

    let view = Rc::new(ProjectedViewport::new(Camera::default(), 1024, 768));
    let frame = RigidTransform::identity();

    let config: FrameWidgetConfig = serde_json::from_str(r#"{ "scale": 0.5, "ring_opacity": 0.6 }"#)
        .context("parsing widget config")?;
    config.validate()?;

    let mut widget = InteractiveFrameWidget::with_config(frame.clone(), config);
    widget.attach_viewport(view.clone());
    let mut camera = TerrainCameraController::default();
    let mut router = InputRouter::new();

    let grab = screen_of(&view, Point3d::new(0.65, 0.0, 0.0))?;
    let release = screen_of(&view, Point3d::new(1.15, 0.0, 0.0))?;
    let empty = ScreenPoint::new(40.0, 40.0);
    let orbit_to = ScreenPoint::new(90.0, 70.0);

    let script = vec![
        ("hover x axis", moved(grab)),
        ("grab x axis", pressed(grab)),
        ("drag", moved(release)),
        ("release", released(release)),
        ("nudge up", key(Key::ArrowUp, Modifiers::NONE)),
        ("nudge yaw", key(Key::ArrowLeft, Modifiers::shift())),
        ("orbit press", pressed(empty)),
        ("orbit drag", moved(orbit_to)),
        ("orbit release", released(orbit_to)),
        ("frame scene", key(Key::Character('r'), Modifiers::NONE)),
    ];

    for (label, event) in &script {
        let mut handlers: [&mut dyn InteractionHandler; 2] = [&mut widget, &mut camera];
        let consumed = router.dispatch(&mut handlers, view.as_ref(), event);
        println!(
            "{:<14} consumed={:<5} position={:?}",
            label,
            consumed,
            frame.position().coords.as_slice()
        );
    }

    let c = view.camera();
    println!("\nCamera now at {:?}", c.position.coords.as_slice());
    println!("Renders requested: {}", view.renders().request_count());

    widget.cleanup();
    Ok(())
}
