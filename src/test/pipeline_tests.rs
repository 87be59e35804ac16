#[cfg(test)]
mod tests {
    use burn_autodiff::Autodiff;
    use anyhow::Result;
    use burn_ndarray::{NdArray, NdArrayDevice};
    use chrono::NaiveDate;
    use ndarray::{Array1, Array3, ArrayView2};
    use std::fs;
    use tempfile::tempdir;

    use crate::config::{BatchConfig, ForecastJob, ForecastSettings};
    use crate::daily::lstm::step_3_lstm_model_arch::DailyLSTMModelConfig;
    use crate::constants::CLOSE_INDEX;
    use crate::daily::lstm::step_4_train_model::{
        ForecastModel, LstmTrainer, SequenceRegressor, TrainingConfig,
    };
    use crate::daily::pipeline::{run_batch, run_prediction};
    use crate::util::file_utils::read_forecast_csv;
    use crate::util::run_report::JobStatus;
    use crate::util::test_utils::{write_linear_close_csv, write_rising_index_csv};

    type TrainBackend = Autodiff<NdArray<f32>>;

    fn tiny_trainer() -> LstmTrainer<TrainBackend> {
        let config = TrainingConfig {
            model: DailyLSTMModelConfig {
                hidden_size: 8,
                num_layers: 1,
                ..Default::default()
            },
            epochs: 2,
            batch_size: 8,
            seed: Some(11),
            ..Default::default()
        };
        LstmTrainer::new(config, NdArrayDevice::Cpu)
    }

    /// Adds a fixed step to the last close in the window
    struct DriftModel {
        step: f64,
    }

    impl ForecastModel for DriftModel {
        fn predict(&self, window: ArrayView2<f64>) -> Result<f64> {
            Ok(window[[window.nrows() - 1, CLOSE_INDEX]] + self.step)
        }
    }

    struct DriftTrainer {
        step: f64,
    }

    impl SequenceRegressor for DriftTrainer {
        type Model = DriftModel;

        fn train(&self, _x: &Array3<f64>, _y: &Array1<f64>) -> Result<Self::Model> {
            Ok(DriftModel { step: self.step })
        }
    }

    fn noise_free() -> ForecastSettings {
        ForecastSettings {
            noise_std_dev: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_linear_close_forecast_keeps_rising() {
        let dir = tempdir().unwrap();
        let input = write_linear_close_csv(dir.path(), "nifty50_stock_data.csv", 40);
        let output = dir.path().join("stock_predictions_nifty50.csv");
        let job = ForecastJob::new(input, &output);

        // one scaled step is one index point over the fitted [100, 139] close range
        let trainer = DriftTrainer { step: 1.0 / 39.0 };
        let outcome = run_prediction(&job, &noise_free(), &trainer).unwrap();

        assert_eq!(outcome.rows, 40);
        assert_eq!(outcome.windows, 25);

        let prices = &outcome.forecast.prices;
        assert_eq!(prices.len(), 15);
        assert!(prices.windows(2).all(|w| w[1] >= w[0]));
        assert!(prices[0] > 139.0);
        for (k, price) in prices.iter().enumerate() {
            assert!((price - (140.0 + k as f64)).abs() < 1e-6);
        }

        let rows = read_forecast_csv(&output).unwrap();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0].0, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert!((rows[14].1 - 154.0).abs() < 1e-6);
    }

    #[test]
    fn test_lstm_forecast_end_to_end() {
        let dir = tempdir().unwrap();
        let input = write_linear_close_csv(dir.path(), "nifty50_stock_data.csv", 40);
        let output = dir.path().join("stock_predictions_nifty50.csv");
        let job = ForecastJob::new(input, &output);

        let outcome = run_prediction(&job, &noise_free(), &tiny_trainer()).unwrap();
        assert_eq!(outcome.windows, 25);
        assert!(outcome.final_loss.unwrap().is_finite());
        assert!(outcome.forecast.prices.iter().all(|p| p.is_finite()));

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("Date,Predicted_Close_Price"));

        let rows = read_forecast_csv(&output).unwrap();
        assert_eq!(rows.len(), 15);
        let mut expected = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        for (date, _) in &rows {
            assert_eq!(*date, expected);
            expected = expected.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = tempdir().unwrap();
        let good = write_rising_index_csv(dir.path(), "nifty200_stock_data.csv", 20);
        let config = BatchConfig {
            jobs: vec![
                ForecastJob::new(dir.path().join("nifty50_stock_data.csv"), dir.path().join("p50.csv")),
                ForecastJob::new(good, dir.path().join("p200.csv")),
            ],
            report_dir: None,
            ..Default::default()
        };

        let report = run_batch(&config, &tiny_trainer());

        assert_eq!(report.jobs[0].status, JobStatus::Failed);
        assert_eq!(report.jobs[1].status, JobStatus::Succeeded);
        assert_eq!(report.jobs[1].rows, Some(20));
        assert!(report.jobs[1].price_min.is_some());
        assert_eq!(read_forecast_csv(dir.path().join("p200.csv")).unwrap().len(), 15);
    }
}
