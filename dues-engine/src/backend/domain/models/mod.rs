pub mod data_issue;
pub mod member;
pub mod mess;
pub mod payment;

pub use data_issue::*;
pub use member::*;
pub use mess::*;
pub use payment::*;
