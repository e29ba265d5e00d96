use eyre::Result;
use futures::future::join_all;
use std::future::Future;

/// Outcome of a structured fan-out: every future ran to completion.
#[derive(Debug)]
pub struct JoinReport<T> {
    pub values: Vec<T>,
    pub failed: usize,
    pub first_error: Option<eyre::Report>,
}

impl<T> JoinReport<T> {
    pub fn is_ok(&self) -> bool {
        self.first_error.is_none()
    }

    /// Successful values, or the first error if anything failed.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(self.values),
        }
    }
}

/// Drives all futures concurrently and waits for every one of them, keeping
/// the successful values, the failure count and the first error in input order.
pub async fn join_all_collect<I, F, T>(futures: I) -> JoinReport<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T>>,
{
    let mut report = JoinReport { values: Vec::new(), failed: 0, first_error: None };

    for result in join_all(futures).await {
        match result {
            Ok(value) => report.values.push(value),
            Err(err) => {
                report.failed += 1;
                if report.first_error.is_none() {
                    report.first_error = Some(err);
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::eyre;

    #[tokio::test]
    async fn test_all_succeed() {
        let report = join_all_collect((0..4).map(|i| async move { Ok::<_, eyre::Report>(i * 2) })).await;
        assert!(report.is_ok());
        assert_eq!(report.into_result().unwrap(), vec![0, 2, 4, 6]);
    }

    #[tokio::test]
    async fn test_first_error_is_kept_and_rest_still_run() {
        let report = join_all_collect((0..5).map(|i| async move {
            if i % 2 == 1 { Err(eyre!("batch {i} failed")) } else { Ok(i) }
        }))
        .await;

        assert_eq!(report.values, vec![0, 2, 4]);
        assert_eq!(report.failed, 2);
        assert_eq!(report.first_error.as_ref().unwrap().to_string(), "batch 1 failed");
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let report = join_all_collect(Vec::<std::future::Ready<Result<()>>>::new()).await;
        assert!(report.values.is_empty());
        assert!(report.is_ok());
    }
}
