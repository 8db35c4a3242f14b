mod comment;
pub use comment::{CommentNode, Walk};

mod display;
pub use display::{delete_warning, format_date, render_comment, render_forest, DepthStyle};

mod draft;
pub use draft::Draft;

mod forest;
pub use forest::Forest;

mod remote;
pub use remote::Remote;

pub mod store;
pub use store::Store;

pub mod api {
    pub use comments_api::*;
}
