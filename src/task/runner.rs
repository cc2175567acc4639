pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A per-item job that can be fanned out with [`BoundedRunner::run_items`].
///
/// [`BoundedRunner::run_items`]: crate::task::BoundedRunner::run_items
#[async_trait::async_trait]
pub trait TaskRunner: Send + Sync {
    type Item: Send;
    type Output: Send;

    async fn run(&self, item: Self::Item) -> Result<Self::Output, BoxError>;
}
