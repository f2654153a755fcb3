use crate::domain::model::LoadSummary;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<LoadSummary> {
        let started = Instant::now();
        tracing::info!("🚀 Starting posting ETL process");

        // Extract
        let postings = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} postings", postings.len());

        // Transform
        let result = self.pipeline.transform(postings).await?;
        tracing::info!(
            "🔄 Transformed into {} line items from {} postings",
            result.line_items.len(),
            result.posting_numbers.len()
        );

        // Load
        let summary = self.pipeline.load(result).await?;
        tracing::info!(
            "✅ Loaded {} rows for warehouse {} in {:.2?}",
            summary.rows_written,
            summary.warehouse_name,
            started.elapsed()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LineItem, Posting, TransformResult};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StagePipeline {
        fail_extract: bool,
        stages: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl Pipeline for StagePipeline {
        async fn extract(&self) -> Result<Vec<Posting>> {
            self.stages.lock().unwrap().push("extract");
            if self.fail_extract {
                return Err(EtlError::SinkError {
                    message: "boom".to_string(),
                });
            }
            Ok(vec![Posting::new("P-1", vec![])])
        }

        async fn transform(&self, postings: Vec<Posting>) -> Result<TransformResult> {
            self.stages.lock().unwrap().push("transform");
            Ok(TransformResult {
                line_items: vec![LineItem::default(); 2],
                posting_numbers: postings.into_iter().map(|p| p.posting_number).collect(),
            })
        }

        async fn load(&self, result: TransformResult) -> Result<LoadSummary> {
            self.stages.lock().unwrap().push("load");
            Ok(LoadSummary {
                warehouse_name: "Main".to_string(),
                postings: result.posting_numbers.len(),
                rows_written: result.line_items.len(),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_run_calls_stages_in_order() {
        let engine = EtlEngine::new(StagePipeline::default());

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.postings, 1);
        assert_eq!(
            *engine.pipeline().stages.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }

    #[tokio::test]
    async fn test_run_stops_at_first_failure() {
        let engine = EtlEngine::new(StagePipeline {
            fail_extract: true,
            ..Default::default()
        });

        assert!(engine.run().await.is_err());
        assert_eq!(*engine.pipeline().stages.lock().unwrap(), vec!["extract"]);
    }
}
