//! One-shot start gate.
//!
//! Browsers only allow audio after a user gesture, so on the web the demo
//! waits for a click on the play button. The first activation removes the
//! button and reveals the canvas; every later activation is a no-op.

/// The activation control and the surface it unveils.
pub trait StartControl {
    fn remove_control(&mut self) -> anyhow::Result<()>;
    fn reveal_surface(&mut self) -> anyhow::Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    Started,
    AlreadyStarted,
}

#[derive(Debug)]
pub struct Bootstrap<C> {
    control: C,
    started: bool,
}

impl<C: StartControl> Bootstrap<C> {
    pub fn new(control: C) -> Self {
        Self {
            control,
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    /// Runs the start sequence the first time only.
    pub fn activate(&mut self) -> anyhow::Result<Activation> {
        if self.started {
            return Ok(Activation::AlreadyStarted);
        }
        // set first: a failing DOM call must not allow a second start
        self.started = true;
        self.control.remove_control()?;
        self.control.reveal_surface()?;
        log::info!("Started");
        Ok(Activation::Started)
    }
}

#[cfg(target_arch = "wasm32")]
pub use dom::DomStartControl;

#[cfg(target_arch = "wasm32")]
mod dom {
    use anyhow::anyhow;
    use wasm_bindgen::{JsCast, prelude::*};
    use web_sys::{AddEventListenerOptions, HtmlCanvasElement, HtmlElement};

    use super::{Activation, Bootstrap, StartControl};
    use crate::config::{CANVAS_ID, PLAY_BUTTON_ID};

    /// `#play` and `#canvas` of the hosting page.
    #[derive(Debug)]
    pub struct DomStartControl {
        button: HtmlElement,
        canvas: HtmlCanvasElement,
    }

    impl DomStartControl {
        /// Both elements must exist when the module starts.
        pub fn find() -> anyhow::Result<Self> {
            let document = web_sys::window()
                .and_then(|window| window.document())
                .ok_or_else(|| anyhow!("no document"))?;
            let button = document
                .get_element_by_id(PLAY_BUTTON_ID)
                .ok_or_else(|| anyhow!("missing #{PLAY_BUTTON_ID}"))?
                .dyn_into::<HtmlElement>()
                .map_err(|_| anyhow!("#{PLAY_BUTTON_ID} is not an HTML element"))?;
            let canvas = document
                .get_element_by_id(CANVAS_ID)
                .ok_or_else(|| anyhow!("missing #{CANVAS_ID}"))?
                .dyn_into::<HtmlCanvasElement>()
                .map_err(|_| anyhow!("#{CANVAS_ID} is not a canvas"))?;
            Ok(Self { button, canvas })
        }

        pub fn canvas(&self) -> &HtmlCanvasElement {
            &self.canvas
        }

        /// Calls `on_start` after the first click, inside the click handler
        /// so it still counts as a user gesture.
        pub fn install(self, on_start: impl FnOnce() + 'static) -> anyhow::Result<()> {
            let button = self.button.clone();
            let mut bootstrap = Bootstrap::new(self);
            let mut on_start = Some(on_start);
            let listener = Closure::<dyn FnMut()>::new(move || match bootstrap.activate() {
                Ok(Activation::Started) => {
                    if let Some(start) = on_start.take() {
                        start();
                    }
                }
                Ok(Activation::AlreadyStarted) => (),
                Err(e) => log::error!("Could not start: {e}"),
            });
            let options = AddEventListenerOptions::new();
            options.set_once(true);
            button
                .add_event_listener_with_callback_and_add_event_listener_options(
                    "click",
                    listener.as_ref().unchecked_ref(),
                    &options,
                )
                .map_err(|e| anyhow!("{e:?}"))?;
            // the page owns the listener from here on
            listener.forget();
            Ok(())
        }
    }

    impl StartControl for DomStartControl {
        fn remove_control(&mut self) -> anyhow::Result<()> {
            self.button.remove();
            Ok(())
        }

        fn reveal_surface(&mut self) -> anyhow::Result<()> {
            self.canvas
                .style()
                .set_property("opacity", "1")
                .map_err(|e| anyhow!("{e:?}"))
        }
    }
}
