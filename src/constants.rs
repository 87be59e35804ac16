// Feature columns, in the order the model sees them. Index 0 must stay close.
pub const FEATURE_COLUMNS: [&str; 8] = [
    "close",
    "open",
    "high",
    "low",
    "shares_traded",
    "price_change",
    "volatility",
    "daily_return",
];
pub const CLOSE_INDEX: usize = 0;

// Raw CSV headers (compared after trimming whitespace)
pub const RAW_DATE_COLUMN: &str = "Date";
pub const RAW_PRICE_COLUMNS: [(&str, &str); 5] = [
    ("Open", "open"),
    ("High", "high"),
    ("Low", "low"),
    ("Close", "close"),
    ("Shares Traded", "shares_traded"),
];

// Cleaned frame date column (days from the common era)
pub const DATE_COLUMN: &str = "date";

// Date formats
pub const INPUT_DATE_FORMAT: &str = "%d-%b-%Y"; // 05-Jan-2021
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

// Output CSV headers
pub const OUTPUT_DATE_HEADER: &str = "Date";
pub const OUTPUT_PRICE_HEADER: &str = "Predicted_Close_Price";

// Model parameters
pub const SEQUENCE_LENGTH: usize = 15; // Number of days to look back
pub const FORECAST_DAYS: usize = 15;
pub const HIDDEN_SIZE: usize = 50;
pub const NUM_LAYERS: usize = 3;
pub const DROPOUT: f64 = 0.2;
pub const LEARNING_RATE: f64 = 0.001;
pub const EPOCHS: usize = 50;
pub const BATCH_SIZE: usize = 32;

// Std-dev of the Gaussian noise added to each scaled forecast
pub const NOISE_STD_DEV: f64 = 0.02;

// Default datasets: (input, output)
pub const DEFAULT_JOBS: [(&str, &str); 3] = [
    ("data/nifty50_stock_data.csv", "data/stock_predictions_nifty50.csv"),
    ("data/nifty100_stock_data.csv", "data/stock_predictions_nifty100.csv"),
    ("data/nifty200_stock_data.csv", "data/stock_predictions_nifty200.csv"),
];
pub const REPORT_DIR: &str = "reports";
