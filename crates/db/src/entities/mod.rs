//! Database entities.

pub mod account;
pub mod block;
pub mod domain_block;
pub mod feed;
pub mod follow;
pub mod key_value;
pub mod like;
pub mod mention;
pub mod notification;
pub mod outbox;
pub mod post;
pub mod repost;
pub mod site;
pub mod user;

pub use account::Entity as Account;
pub use block::Entity as Block;
pub use domain_block::Entity as DomainBlock;
pub use feed::Entity as Feed;
pub use follow::Entity as Follow;
pub use key_value::Entity as KeyValue;
pub use like::Entity as Like;
pub use mention::Entity as Mention;
pub use notification::Entity as Notification;
pub use outbox::Entity as Outbox;
pub use post::Entity as Post;
pub use repost::Entity as Repost;
pub use site::Entity as Site;
pub use user::Entity as User;
