use std::cell::RefCell;
use std::rc::{Rc, Weak};

use foundation::geo::LngLat;
use runtime::{Job, PhaseScheduler};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    Bottom,
    Top,
    Left,
    Right,
}

impl Anchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::Bottom => "bottom",
            Anchor::Top => "top",
            Anchor::Left => "left",
            Anchor::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupStyle {
    pub max_width_px: Option<f64>,
}

impl PopupStyle {
    pub fn max_width(px: f64) -> Self {
        Self {
            max_width_px: Some(px),
        }
    }

    /// CSS `max-width` value; `none` lifts the widget's own limit.
    pub fn max_width_css(&self) -> String {
        match self.max_width_px {
            Some(px) => format!("{px}px"),
            None => "none".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupOptions {
    pub anchor: Anchor,
    pub close_button: bool,
    pub close_on_click: bool,
    pub class_name: String,
    pub style: PopupStyle,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            anchor: Anchor::Bottom,
            close_button: false,
            close_on_click: true,
            class_name: "my-popup".to_string(),
            style: PopupStyle::max_width(400.0),
        }
    }
}

pub type CloseHandler = Rc<dyn Fn()>;

/// Host popup widget anchored to a map position.
///
/// Widgets may drop the style passed to [`PopupWidget::mount`] on their first
/// paint; the presenter re-applies it through [`PopupWidget::apply_style`].
pub trait PopupWidget {
    /// Creates the overlay. `on_close` must be invoked when the widget's own
    /// chrome closes it (outside click, close button).
    fn mount(&mut self, position: LngLat, options: &PopupOptions, on_close: CloseHandler);
    fn set_position(&mut self, position: LngLat);
    fn set_content(&mut self, html: &str);
    fn apply_style(&mut self, style: &PopupStyle);
    fn remove(&mut self);
}

struct PresenterState<W> {
    widget: W,
    mounted: bool,
    on_close: Option<CloseHandler>,
}

/// Shows at most one popup through a [`PopupWidget`].
///
/// On mount the style is applied three times: with the mount options,
/// directly after mount, and from a layout-phase job that runs before the
/// next paint. Later `show` calls move the mounted widget instead of
/// remounting it.
pub struct PopupPresenter<W: PopupWidget + 'static> {
    state: Rc<RefCell<PresenterState<W>>>,
    scheduler: Rc<PhaseScheduler>,
    options: PopupOptions,
}

impl<W: PopupWidget + 'static> PopupPresenter<W> {
    pub fn new(widget: W, options: PopupOptions, scheduler: Rc<PhaseScheduler>) -> Self {
        Self {
            state: Rc::new(RefCell::new(PresenterState {
                widget,
                mounted: false,
                on_close: None,
            })),
            scheduler,
            options,
        }
    }

    pub fn options(&self) -> &PopupOptions {
        &self.options
    }

    pub fn is_shown(&self) -> bool {
        self.state.borrow().mounted
    }

    /// Runs `f` against the widget.
    pub fn with_widget<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.state.borrow().widget)
    }

    pub fn show(&self, position: LngLat, html: &str, on_close: CloseHandler) {
        let mut state = self.state.borrow_mut();
        if state.mounted {
            state.widget.set_position(position);
        } else {
            let handler = close_handler(Rc::downgrade(&self.state));
            state.widget.mount(position, &self.options, handler);
            state.widget.apply_style(&self.options.style);
            state.mounted = true;
            self.schedule_style();
            debug!(lon = position.lon, lat = position.lat, "popup mounted");
        }
        state.widget.set_content(html);
        state.on_close = Some(on_close);
    }

    pub fn hide(&self) {
        let mut state = self.state.borrow_mut();
        if !state.mounted {
            return;
        }
        state.mounted = false;
        state.on_close = None;
        state.widget.remove();
        debug!("popup removed");
    }

    fn schedule_style(&self) {
        let weak = Rc::downgrade(&self.state);
        let style = self.options.style.clone();
        self.scheduler.schedule(Job::layout("popup-style", move |_frame| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let Ok(mut state) = state.try_borrow_mut() else {
                return;
            };
            if state.mounted {
                state.widget.apply_style(&style);
            }
        }));
    }
}

fn close_handler<W: PopupWidget + 'static>(
    state: Weak<RefCell<PresenterState<W>>>,
) -> CloseHandler {
    Rc::new(move || {
        let Some(state) = state.upgrade() else {
            return;
        };
        // A busy presenter means the close was caused by our own `hide`.
        let on_close = match state.try_borrow_mut() {
            Ok(mut s) if s.mounted => {
                s.mounted = false;
                s.on_close.take()
            }
            _ => None,
        };
        if let Some(cb) = on_close {
            cb();
        }
    })
}

impl<W: PopupWidget + 'static> Drop for PopupPresenter<W> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut()
            && state.mounted
        {
            state.mounted = false;
            state.widget.remove();
        }
    }
}
