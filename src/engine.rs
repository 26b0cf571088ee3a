pub(crate) mod input;

use crate::browser::{self, LoopClosure};
use crate::debounce::debounce;
use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement};

/// Quiet period before a burst of resize events is applied.
const RESIZE_DEBOUNCE_MS: i32 = 100;

/// The capability set a game hands to the harness.
///
/// Only [`Game::init`] is required; every per-frame and per-event hook has a
/// no-op default body, so a game implements exactly the callbacks it cares
/// about.
pub trait Game {
    /// Called exactly once, after the canvas is mounted and sized but before
    /// the first frame. An error aborts startup.
    fn init(&mut self) -> Result<()>;

    /// Called once per frame with the elapsed seconds since the previous
    /// frame. The first delta spans startup to the first frame.
    fn update(&mut self, _delta: f64) {}

    /// Called once per frame, after the canvas has been cleared.
    fn draw(&self, _renderer: &Renderer) {}

    /// Called for every key press, with the normalized key name.
    fn key_down(&mut self, _key: &str) {}

    /// Called for every key release, with the normalized key name.
    fn key_up(&mut self, _key: &str) {}

    /// Called after the canvas has been refit to the viewport, including
    /// once during startup.
    fn on_resize(&mut self) {}
}

/// Where the canvas gets attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Mount {
    /// A CSS selector, resolved once at startup.
    Selector(String),
    /// A container element the caller already holds.
    Element(HtmlElement),
}

impl From<&str> for Mount {
    fn from(selector: &str) -> Self {
        Mount::Selector(selector.to_string())
    }
}

impl From<String> for Mount {
    fn from(selector: String) -> Self {
        Mount::Selector(selector)
    }
}

impl From<HtmlElement> for Mount {
    fn from(element: HtmlElement) -> Self {
        Mount::Element(element)
    }
}

/// One-shot configuration for [`run_game`].
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Container the canvas is appended to.
    ///
    /// Defaults to the `#root` selector.
    pub mount: Mount,

    /// Forwarded verbatim to `imageSmoothingEnabled` on the 2d context :
    /// `true` turns smoothing on.
    ///
    /// Defaults to `true`.
    pub pixelize: bool,

    /// CSS background applied to the canvas element, when set.
    ///
    /// Defaults to `None`.
    pub background: Option<String>,
}

impl GameConfig {
    pub fn with_mount(mut self, mount: impl Into<Mount>) -> Self {
        self.mount = mount.into();
        self
    }

    pub fn with_pixelize(mut self, pixelize: bool) -> Self {
        self.pixelize = pixelize;
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mount: Mount::Selector("#root".to_string()),
            pixelize: true,
            background: None,
        }
    }
}

/// The canvas/context pair owned by a running loop.
pub struct Renderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.context
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Erase the full pixel rectangle.
    pub fn clear(&self) {
        self.context.clear_rect(
            0.0,
            0.0,
            self.canvas.width().into(),
            self.canvas.height().into(),
        );
    }
}

/// Handle to a running loop.
///
/// Cloneable; [`LoopHandle::stop`] is irreversible.
#[derive(Clone)]
pub struct LoopHandle {
    cancelled: Rc<Cell<bool>>,
    frame_request: Rc<Cell<Option<i32>>>,
}

impl LoopHandle {
    fn new() -> Self {
        Self {
            cancelled: Rc::new(Cell::new(false)),
            frame_request: Rc::new(Cell::new(None)),
        }
    }

    /// Halt the loop : cancels the pending frame request and keeps any frame
    /// that still fires from stepping or rescheduling.
    pub fn stop(&self) {
        self.cancelled.set(true);
        if let Some(request) = self.frame_request.take() {
            let _ = browser::cancel_animation_frame(request);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancelled.get()
    }
}

pub struct GameLoop {
    last_frame: f64,
}

type SharedLoopClosure = Rc<RefCell<Option<LoopClosure>>>;

impl GameLoop {
    /// Elapsed seconds since the previous step, from the frame timestamp.
    fn delta_seconds(&mut self, now: f64) -> f64 {
        let delta = (now - self.last_frame) / 1000.0;
        self.last_frame = now;
        delta
    }

    pub fn start(game: impl Game + 'static, config: GameConfig) -> Result<LoopHandle> {
        console_error_panic_hook::set_once();

        let canvas = browser::create_canvas()?;
        let context = browser::context_2d(&canvas)?;

        if let Some(background) = &config.background {
            canvas
                .style()
                .set_property("background", background)
                .map_err(|err| anyhow!("Could not set canvas background : {:#?}", err))?;
        }
        context.set_image_smoothing_enabled(config.pixelize);

        let container = match &config.mount {
            Mount::Selector(selector) => browser::element_by_selector(selector)?,
            Mount::Element(element) => element.clone(),
        };

        let game = Rc::new(RefCell::new(game));

        attach_resize_listener(&canvas, &game)?;
        let mut keyevent_receiver = input::prepare_input()?;

        fit_canvas_to_viewport(&canvas, &game)?;
        container
            .append_child(&canvas)
            .map_err(|err| anyhow!("Could not append canvas to container : {:#?}", err))?;
        game.borrow_mut().init()?;

        let renderer = Renderer { canvas, context };
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
        };
        let handle = LoopHandle::new();

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();

        let loop_game = Rc::clone(&game);
        let cancelled = Rc::clone(&handle.cancelled);
        let frame_request = Rc::clone(&handle.frame_request);
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            if cancelled.get() {
                return;
            }
            input::process_input(&mut *loop_game.borrow_mut(), &mut keyevent_receiver);
            let delta = game_loop.delta_seconds(perf);
            loop_game.borrow_mut().update(delta);
            renderer.clear();
            loop_game.borrow().draw(&renderer);
            // a game may stop its own loop from update or draw
            if cancelled.get() {
                return;
            }
            match browser::request_animation_frame(f.borrow().as_ref().unwrap()) {
                Ok(request) => frame_request.set(Some(request)),
                Err(err) => error!("Could not schedule next frame : {:#?}", err),
            }
        }));

        let first_request = browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;
        handle.frame_request.set(Some(first_request));

        Ok(handle)
    }
}

/// Mount a game and start stepping it.
///
/// Startup order : background, smoothing flag, resize and key listeners,
/// initial viewport fit, canvas attachment, `init`, first frame request.
pub fn run_game(game: impl Game + 'static, config: GameConfig) -> Result<LoopHandle> {
    GameLoop::start(game, config)
}

fn fit_canvas_to_viewport<G: Game>(
    canvas: &HtmlCanvasElement,
    game: &Rc<RefCell<G>>,
) -> Result<()> {
    let (width, height) = browser::viewport_size()?;
    canvas.set_width(width);
    canvas.set_height(height);
    game.borrow_mut().on_resize();
    Ok(())
}

fn attach_resize_listener<G: Game + 'static>(
    canvas: &HtmlCanvasElement,
    game: &Rc<RefCell<G>>,
) -> Result<()> {
    let canvas = canvas.clone();
    let game = Rc::clone(game);
    let mut refit = debounce(
        move || {
            if let Err(err) = fit_canvas_to_viewport(&canvas, &game) {
                error!("Could not refit canvas : {:#?}", err);
            }
        },
        RESIZE_DEBOUNCE_MS,
    );

    let listener = browser::closure_wrap(Box::new(move || refit()) as Box<dyn FnMut()>);
    browser::window()?
        .add_event_listener_with_callback("resize", listener.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Could not attach resize listener : {:#?}", err))?;
    // listeners live for the page lifetime
    listener.forget();
    Ok(())
}
