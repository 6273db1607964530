//! NodeView render support: hit testing and the display list.
//!
//! Nothing here touches pixels. [`hit`] answers "what is under this point",
//! [`scene`] turns a graph into back-to-front drawing primitives that a host
//! toolkit paints however it likes.

pub mod hit;
pub mod scene;

pub use hit::{Hit, HitTester};
pub use scene::{DisplayItem, SceneStyle, display_list};
