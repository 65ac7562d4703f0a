//! Size-bucket and budget-bucket normalization used by the scorer before it
//! calls the scoring adapter (§4.3).

/// Map a company size bucket string to an estimated employee count.
pub fn normalize_employee_count(size: Option<&str>) -> i64 {
    match size.unwrap_or("") {
        "1-10" => 5,
        "11-50" => 30,
        "51-200" => 125,
        "201-1000" => 600,
        "1000+" => 2000,
        _ => 0,
    }
}

/// Map a budget-range bucket string to an estimated annual revenue figure.
pub fn normalize_revenue(budget_range: Option<&str>) -> f64 {
    match budget_range.unwrap_or("") {
        "<10k" => 50_000.0,
        "10k-50k" => 200_000.0,
        "50k-100k" => 500_000.0,
        "100k-500k" => 2_500_000.0,
        "500k+" => 6_000_000.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_count_buckets() {
        assert_eq!(normalize_employee_count(Some("1-10")), 5);
        assert_eq!(normalize_employee_count(Some("1000+")), 2000);
        assert_eq!(normalize_employee_count(Some("nonsense")), 0);
        assert_eq!(normalize_employee_count(None), 0);
    }

    #[test]
    fn revenue_buckets() {
        assert_eq!(normalize_revenue(Some("<10k")), 50_000.0);
        assert_eq!(normalize_revenue(Some("500k+")), 6_000_000.0);
        assert_eq!(normalize_revenue(None), 0.0);
    }
}
