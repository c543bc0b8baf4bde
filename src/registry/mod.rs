//! Registry retargeting: account id resolution and ECR URL rewriting

pub mod account;
pub mod rewrite;

pub use account::{resolve_account_id, AccountLookup, AwsCliLookup, AUTO_ACCOUNT};
pub use rewrite::{is_ecr_path, rewrite_images, rewrite_registry_path};
