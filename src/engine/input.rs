use super::Game;
use crate::browser;
use anyhow::{anyhow, Result};
use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use wasm_bindgen::JsCast;
use web_sys::KeyboardEvent;

/// A single keyboard transition, captured at event time and drained by the
/// frame step.
pub(crate) enum KeyPress {
    Down(String),
    Up(String),
}

/// Map a DOM key name to the name games receive. The literal space character
/// becomes `"Spacebar"`; everything else passes through unchanged.
pub(crate) fn normalize_key(key: &str) -> &str {
    if key == " " {
        "Spacebar"
    } else {
        key
    }
}

/// Attach window-level keydown/keyup listeners feeding an unbounded channel.
/// Listeners live for the page lifetime.
pub(crate) fn prepare_input() -> Result<UnboundedReceiver<KeyPress>> {
    let (keydown_sender, keyevent_receiver) = unbounded();
    let keyup_sender = keydown_sender.clone();

    let onkeydown = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
        let _ = keydown_sender.unbounded_send(KeyPress::Down(event.key()));
    }) as Box<dyn FnMut(KeyboardEvent)>);
    let onkeyup = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
        let _ = keyup_sender.unbounded_send(KeyPress::Up(event.key()));
    }) as Box<dyn FnMut(KeyboardEvent)>);

    let window = browser::window()?;
    window
        .add_event_listener_with_callback("keydown", onkeydown.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Could not attach keydown listener : {:#?}", err))?;
    window
        .add_event_listener_with_callback("keyup", onkeyup.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Could not attach keyup listener : {:#?}", err))?;
    onkeydown.forget();
    onkeyup.forget();

    Ok(keyevent_receiver)
}

/// Drain every queued transition and forward it to the game, in arrival
/// order, with the key name normalized.
pub(crate) fn process_input(
    game: &mut impl Game,
    keyevent_receiver: &mut UnboundedReceiver<KeyPress>,
) {
    loop {
        match keyevent_receiver.try_next() {
            // closed channel
            Ok(None) => break,
            // nothing queued this frame
            Err(_err) => break,
            Ok(Some(KeyPress::Down(key))) => game.key_down(normalize_key(&key)),
            Ok(Some(KeyPress::Up(key))) => game.key_up(normalize_key(&key)),
        }
    }
}
