//! In-browser integration tests, driven by wasm-bindgen-test.
//!
//! Run with `wasm-pack test --headless --chrome` (or `--firefox`).

#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{anyhow, Result};
use canvas_harness::{debounce, run_game, Game, GameConfig, Renderer};
use js_sys::Promise;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Event, HtmlElement, KeyboardEvent, KeyboardEventInit};

wasm_bindgen_test_configure!(run_in_browser);

/// A game that records every callback it receives, sharing the counters with
/// the test through `Rc`.
#[derive(Clone, Default)]
struct Probe {
    inits: Rc<Cell<u32>>,
    updates: Rc<Cell<u32>>,
    draws: Rc<Cell<u32>>,
    resizes: Rc<Cell<u32>>,
    deltas: Rc<RefCell<Vec<f64>>>,
    keys: Rc<RefCell<Vec<String>>>,
}

impl Game for Probe {
    fn init(&mut self) -> Result<()> {
        self.inits.set(self.inits.get() + 1);
        Ok(())
    }

    fn update(&mut self, delta: f64) {
        self.updates.set(self.updates.get() + 1);
        self.deltas.borrow_mut().push(delta);
    }

    fn draw(&self, _renderer: &Renderer) {
        self.draws.set(self.draws.get() + 1);
    }

    fn key_down(&mut self, key: &str) {
        self.keys.borrow_mut().push(format!("down:{}", key));
    }

    fn key_up(&mut self, key: &str) {
        self.keys.borrow_mut().push(format!("up:{}", key));
    }

    fn on_resize(&mut self) {
        self.resizes.set(self.resizes.get() + 1);
    }
}

struct FailingGame;

impl Game for FailingGame {
    fn init(&mut self) -> Result<()> {
        Err(anyhow!("refusing to start"))
    }
}

fn window() -> web_sys::Window {
    web_sys::window().unwrap()
}

/// Append a fresh container element to the page body.
fn fresh_mount(id: &str) -> HtmlElement {
    let document = window().document().unwrap();
    let mount = document.create_element("div").unwrap();
    mount.set_id(id);
    document.body().unwrap().append_child(&mount).unwrap();
    mount.dyn_into().unwrap()
}

async fn next_frame() {
    JsFuture::from(Promise::new(&mut |resolve, _reject| {
        window().request_animation_frame(&resolve).unwrap();
    }))
    .await
    .unwrap();
}

async fn frames(count: u32) {
    for _ in 0..count {
        next_frame().await;
    }
}

async fn sleep(ms: i32) {
    JsFuture::from(Promise::new(&mut |resolve, _reject| {
        window()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    }))
    .await
    .unwrap();
}

fn dispatch_key(kind: &str, key: &str) {
    let init = KeyboardEventInit::new();
    init.set_key(key);
    let event = KeyboardEvent::new_with_keyboard_event_init_dict(kind, &init).unwrap();
    window().dispatch_event(&event).unwrap();
}

#[wasm_bindgen_test]
async fn init_runs_once_then_update_and_draw_step_together() {
    let mount = fresh_mount("loop-mount");
    let probe = Probe::default();
    let handle = run_game(probe.clone(), GameConfig::default().with_mount(mount)).unwrap();

    frames(5).await;
    handle.stop();

    assert_eq!(probe.inits.get(), 1);
    assert!(probe.draws.get() >= 3);
    assert_eq!(probe.updates.get(), probe.draws.get());
    assert!(probe.deltas.borrow().iter().all(|delta| *delta >= 0.0));
}

#[wasm_bindgen_test]
async fn stop_halts_the_loop() {
    let mount = fresh_mount("stop-mount");
    let probe = Probe::default();
    let handle = run_game(probe.clone(), GameConfig::default().with_mount(mount)).unwrap();

    frames(3).await;
    handle.stop();
    assert!(handle.is_stopped());
    let stepped = probe.updates.get();

    frames(3).await;
    assert_eq!(probe.updates.get(), stepped);
}

#[wasm_bindgen_test]
async fn applies_config_to_the_mounted_canvas() {
    let mount = fresh_mount("config-mount");
    let probe = Probe::default();
    let handle = run_game(
        probe,
        GameConfig::default()
            .with_mount(mount.clone())
            .with_pixelize(false)
            .with_background("rgb(12, 34, 56)"),
    )
    .unwrap();

    let canvas: web_sys::HtmlCanvasElement = mount
        .query_selector("canvas")
        .unwrap()
        .expect("canvas should be appended to the mount element")
        .dyn_into()
        .unwrap();
    let context: web_sys::CanvasRenderingContext2d = canvas
        .get_context("2d")
        .unwrap()
        .unwrap()
        .dyn_into()
        .unwrap();

    assert!(!context.image_smoothing_enabled());
    assert!(canvas
        .style()
        .get_property_value("background")
        .contains("rgb(12, 34, 56)"));

    let viewport_width = window().inner_width().unwrap().as_f64().unwrap() as u32;
    let viewport_height = window().inner_height().unwrap().as_f64().unwrap() as u32;
    assert_eq!(canvas.width(), viewport_width);
    assert_eq!(canvas.height(), viewport_height);

    handle.stop();
}

#[wasm_bindgen_test]
async fn unresolvable_selector_fails_fast() {
    assert!(run_game(
        Probe::default(),
        GameConfig::default().with_mount("#no-such-mount")
    )
    .is_err());
}

#[wasm_bindgen_test]
async fn init_error_aborts_startup() {
    let mount = fresh_mount("fail-mount");
    assert!(run_game(FailingGame, GameConfig::default().with_mount(mount)).is_err());
}

#[wasm_bindgen_test]
async fn forwards_normalized_key_transitions_in_order() {
    let mount = fresh_mount("key-mount");
    let probe = Probe::default();
    let handle = run_game(probe.clone(), GameConfig::default().with_mount(mount)).unwrap();

    dispatch_key("keydown", " ");
    dispatch_key("keydown", "ArrowUp");
    dispatch_key("keyup", " ");
    frames(2).await;
    handle.stop();

    let keys = probe.keys.borrow().clone();
    assert_eq!(keys, vec!["down:Spacebar", "down:ArrowUp", "up:Spacebar"]);
}

#[wasm_bindgen_test]
async fn resize_bursts_collapse_to_one_trailing_refit() {
    let mount = fresh_mount("resize-mount");
    let probe = Probe::default();
    let handle = run_game(probe.clone(), GameConfig::default().with_mount(mount)).unwrap();

    // the initial viewport fit fires on_resize exactly once
    assert_eq!(probe.resizes.get(), 1);

    for _ in 0..10 {
        window()
            .dispatch_event(&Event::new("resize").unwrap())
            .unwrap();
    }
    // still quiet : the trailing call only lands after the debounce window
    assert_eq!(probe.resizes.get(), 1);

    sleep(250).await;
    assert_eq!(probe.resizes.get(), 2);

    handle.stop();
}

#[wasm_bindgen_test]
async fn debounce_collapses_a_burst_to_one_trailing_call() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut debounced = debounce(move || counter.set(counter.get() + 1), 50);

    for _ in 0..10 {
        debounced();
    }
    assert_eq!(calls.get(), 0);

    sleep(150).await;
    assert_eq!(calls.get(), 1);
}
