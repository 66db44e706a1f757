//! Core binding model: widgets, zones, managers, navigators, pages, surfaces.
//!
//! Ownership is arena-style: a [`surface::Surface`] owns its widgets and
//! widget-action managers in flat vectors addressed by index newtypes, zones
//! and navigators refer to them by id, and every cross-link is a name or index
//! lookup rather than a reference.

pub mod activation;
pub mod manager;
pub mod navigator;
pub mod page;
pub mod surface;
pub mod widget;
pub mod zone;

pub use manager::WidgetActionManager;
pub use navigator::{NavigatorBank, NavigatorRef};
pub use page::{Page, PageState};
pub use surface::Surface;
pub use widget::Widget;
pub use zone::{Zone, ZoneState};

/// Index of a widget within its surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub usize);

/// Index of a widget-action manager within its surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagerId(pub usize);

/// Index of a channel navigator within its page's bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavigatorId(pub usize);
