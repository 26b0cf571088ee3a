use crate::browser;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;

/// Wrap a callback so that repeated invocations within `delay_ms` collapse
/// into a single trailing call, fired once the burst has been quiet for the
/// full window.
///
/// Built on the browser timer : every invocation clears the previously
/// scheduled timeout and arms a fresh one.
pub fn debounce<F>(callback: F, delay_ms: i32) -> impl FnMut()
where
    F: FnMut() + 'static,
{
    let callback = Rc::new(RefCell::new(callback));
    // the armed timer handle plus the closure keeping it callable
    let pending: Rc<RefCell<Option<(i32, Closure<dyn FnMut()>)>>> = Rc::new(RefCell::new(None));

    move || {
        if let Some((stale_handle, _stale)) = pending.borrow_mut().take() {
            // clearing an already-fired handle is a no-op; a fired closure is
            // only dropped here, never while it is still executing
            let _ = browser::clear_timeout(stale_handle);
        }

        let callback = Rc::clone(&callback);
        let fire = browser::closure_once(move || {
            let mut callback = callback.borrow_mut();
            (*callback)();
        });

        match browser::set_timeout(&fire, delay_ms) {
            Ok(handle) => *pending.borrow_mut() = Some((handle, fire)),
            Err(err) => error!("Could not schedule debounced callback : {:#?}", err),
        }
    }
}
