pub mod canvas;
pub mod config;
pub mod drag;
pub mod error;
pub mod expand_state;
pub mod layout;
pub mod lookup;
pub mod order;
pub mod overlay;
pub mod session;
pub mod source;
pub mod tree;

pub use config::{CoMove, LayoutConfig};
pub use drag::{DragController, PointerButton};
pub use error::{ConfigError, LoadError};
pub use session::{Frame, GraphSession, RenderNode};
pub use source::{FolderItem, Service};
pub use tree::{NodeId, TreeNode};
