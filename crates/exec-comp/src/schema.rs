//! Column layout of the CEO compensation spreadsheet.
//!
//! The spreadsheet has one row per company with financial metrics, market
//! indicators, categorical descriptors and the CEO's pay. Raw headers are
//! renamed to the canonical identifiers below before anything else runs.

use crate::config::{
    AnalysisConfig, ColumnRename, FactorTestSpec, GroupSummarySpec, MedianSplitSpec,
    PipelineConfig, RegressionSpec,
};

/// Canonical column identifiers.
pub mod columns {
    pub const COMPANY: &str = "company";
    pub const CEO_NAME: &str = "ceo_name";
    pub const HQ_STATE: &str = "hq_state";
    pub const INDUSTRY: &str = "industry";
    pub const REVENUE: &str = "revenue";
    pub const REVENUE_GROWTH: &str = "revenue_growth";
    pub const NET_INCOME: &str = "net_income";
    pub const PROFIT_MARGIN: &str = "profit_margin";
    pub const TOTAL_ASSETS: &str = "total_assets";
    pub const MARKET_CAP: &str = "market_cap";
    pub const SHAREHOLDER_RETURN: &str = "shareholder_return";
    pub const EMPLOYEES: &str = "employees";
    pub const CEO_PAY: &str = "ceo_pay";
    pub const MEDIAN_WORKER_PAY: &str = "median_worker_pay";
    pub const PAY_RATIO: &str = "pay_ratio";
}

use columns::*;

/// Raw spreadsheet header → canonical identifier.
pub const RENAME_TABLE: [(&str, &str); 15] = [
    ("Company Name", COMPANY),
    ("CEO Name", CEO_NAME),
    ("HQ Location", HQ_STATE),
    ("Industry Group", INDUSTRY),
    ("Revenue ($M)", REVENUE),
    ("Revenue Growth (%)", REVENUE_GROWTH),
    ("Net Income ($M)", NET_INCOME),
    ("Profit Margin (%)", PROFIT_MARGIN),
    ("Total Assets ($M)", TOTAL_ASSETS),
    ("Market Cap ($M)", MARKET_CAP),
    ("1-Year Shareholder Return (%)", SHAREHOLDER_RETURN),
    ("Employees", EMPLOYEES),
    ("CEO Pay ($M)", CEO_PAY),
    ("Median Worker Pay ($)", MEDIAN_WORKER_PAY),
    ("Pay Ratio", PAY_RATIO),
];

pub const NUMERIC_COLUMNS: [&str; 11] = [
    REVENUE,
    REVENUE_GROWTH,
    NET_INCOME,
    PROFIT_MARGIN,
    TOTAL_ASSETS,
    MARKET_CAP,
    SHAREHOLDER_RETURN,
    EMPLOYEES,
    CEO_PAY,
    MEDIAN_WORKER_PAY,
    PAY_RATIO,
];

/// The company name is an identifier, not a category, so it is left out
/// and passes through imputation untouched.
pub const CATEGORICAL_COLUMNS: [&str; 3] = [HQ_STATE, INDUSTRY, CEO_NAME];

/// Analyses the CEO pay report runs.
pub fn ceo_analysis() -> AnalysisConfig {
    AnalysisConfig {
        regression: Some(RegressionSpec {
            target: CEO_PAY.to_string(),
            predictors: [REVENUE, PROFIT_MARGIN, MARKET_CAP, SHAREHOLDER_RETURN, EMPLOYEES]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            standardize: true,
        }),
        group_summaries: vec![
            GroupSummarySpec {
                value: CEO_PAY.to_string(),
                by: INDUSTRY.to_string(),
                min_group_size: 5,
            },
            GroupSummarySpec {
                value: CEO_PAY.to_string(),
                by: HQ_STATE.to_string(),
                min_group_size: 5,
            },
        ],
        median_splits: vec![
            MedianSplitSpec {
                value: CEO_PAY.to_string(),
                split_on: MARKET_CAP.to_string(),
            },
            MedianSplitSpec {
                value: CEO_PAY.to_string(),
                split_on: SHAREHOLDER_RETURN.to_string(),
            },
        ],
        factor_tests: vec![FactorTestSpec {
            value: CEO_PAY.to_string(),
            factor: INDUSTRY.to_string(),
            min_group_size: 5,
        }],
        ..AnalysisConfig::default()
    }
}

impl PipelineConfig {
    /// Configuration for the CEO compensation spreadsheet.
    pub fn ceo_compensation() -> Self {
        Self {
            renames: RENAME_TABLE
                .iter()
                .map(|(from, to)| ColumnRename::new(*from, *to))
                .collect(),
            numeric_columns: NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect(),
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            analysis: ceo_analysis(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_preset_is_valid() {
        assert!(PipelineConfig::ceo_compensation().validate().is_ok());
    }

    #[test]
    fn test_every_listed_column_has_a_rename() {
        let targets: HashSet<&str> = RENAME_TABLE.iter().map(|(_, to)| *to).collect();
        for column in NUMERIC_COLUMNS.iter().chain(CATEGORICAL_COLUMNS.iter()) {
            assert!(targets.contains(column), "{column} has no raw header");
        }
    }

    #[test]
    fn test_regression_predictors_are_numeric() {
        let analysis = ceo_analysis();
        let regression = analysis.regression.unwrap();
        for predictor in &regression.predictors {
            assert!(NUMERIC_COLUMNS.contains(&predictor.as_str()));
        }
        assert!(!regression.predictors.contains(&regression.target));
    }
}
