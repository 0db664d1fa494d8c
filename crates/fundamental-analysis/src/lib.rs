use analysis_core::stats::safe_div;
use analysis_core::{CompanyInfo, FinancialMetrics, FinancialStatement};

/// Ratio calculator over the latest annual statements.
///
/// Margins, returns and dividend yield are percentages; the liquidity,
/// leverage and turnover ratios are plain multiples. Any figure whose inputs
/// are missing (or whose denominator is zero) is left as `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    fn calculate_pe_ratio(&self, price: Option<f64>, eps: Option<f64>) -> Option<f64> {
        match eps {
            Some(e) if e > 0.0 => safe_div(price, Some(e)),
            _ => None,
        }
    }

    fn calculate_eps(&self, statement: &FinancialStatement, company: Option<&CompanyInfo>) -> Option<f64> {
        company
            .and_then(|c| c.trailing_eps)
            .filter(|e| e.is_finite())
            .or_else(|| safe_div(statement.net_income, company.and_then(|c| c.shares_outstanding)))
    }

    fn calculate_dividend_yield(&self, company: Option<&CompanyInfo>, price: Option<f64>) -> Option<f64> {
        let company = company?;
        company
            .dividend_yield
            .filter(|y| y.is_finite())
            .or_else(|| safe_div(company.dividend_rate, price))
            .map(|y| y * 100.0)
    }

    fn percent(&self, numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
        safe_div(numerator, denominator).map(|r| r * 100.0)
    }

    fn calculate_gross_profit(&self, statement: &FinancialStatement) -> Option<f64> {
        statement.gross_profit.or_else(|| {
            let (revenue, cost) = (statement.revenue?, statement.cost_of_revenue?);
            Some(revenue - cost)
        })
    }

    fn calculate_quick_ratio(&self, statement: &FinancialStatement) -> Option<f64> {
        let liquid = statement.current_assets? - statement.inventory.unwrap_or(0.0);
        safe_div(Some(liquid), statement.current_liabilities)
    }

    /// Capital expenditures are reported as an outflow; either sign is accepted.
    fn calculate_free_cash_flow(&self, statement: &FinancialStatement) -> Option<f64> {
        let operating = statement.operating_cash_flow?;
        let capex = statement.capital_expenditures.unwrap_or(0.0).abs();
        Some(operating - capex)
    }

    pub fn calculate(
        &self,
        statement: Option<&FinancialStatement>,
        company: Option<&CompanyInfo>,
        price: Option<f64>,
    ) -> FinancialMetrics {
        let empty = FinancialStatement::default();
        let s = statement.unwrap_or(&empty);

        let eps = self.calculate_eps(s, company);
        let gross_profit = self.calculate_gross_profit(s);
        let debt = s.total_debt.or(s.total_liabilities);

        FinancialMetrics {
            revenue: s.revenue,
            gross_profit,
            operating_income: s.operating_income,
            net_income: s.net_income,
            total_assets: s.total_assets,
            total_liabilities: s.total_liabilities,
            total_equity: s.stockholders_equity,
            operating_cash_flow: s.operating_cash_flow,
            investing_cash_flow: s.investing_cash_flow,
            financing_cash_flow: s.financing_cash_flow,
            free_cash_flow: self.calculate_free_cash_flow(s),
            eps,
            pe_ratio: self.calculate_pe_ratio(price, eps),
            dividend_yield: self.calculate_dividend_yield(company, price),
            beta: company.and_then(|c| c.beta),
            gross_margin: self.percent(gross_profit, s.revenue),
            operating_margin: self.percent(s.operating_income, s.revenue),
            profit_margin: self.percent(s.net_income, s.revenue),
            return_on_equity: self.percent(s.net_income, s.stockholders_equity),
            return_on_assets: self.percent(s.net_income, s.total_assets),
            current_ratio: safe_div(s.current_assets, s.current_liabilities),
            quick_ratio: self.calculate_quick_ratio(s),
            debt_to_equity: safe_div(debt, s.stockholders_equity),
            debt_to_assets: safe_div(debt, s.total_assets),
            asset_turnover: safe_div(s.revenue, s.total_assets),
            inventory_turnover: safe_div(s.cost_of_revenue, s.inventory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Symbol;
    use approx::assert_relative_eq;

    fn statement() -> FinancialStatement {
        FinancialStatement {
            fiscal_year: Some(2023),
            revenue: Some(1_000.0),
            cost_of_revenue: Some(600.0),
            gross_profit: None,
            operating_income: Some(250.0),
            net_income: Some(200.0),
            total_assets: Some(2_000.0),
            total_liabilities: Some(1_200.0),
            stockholders_equity: Some(800.0),
            current_assets: Some(500.0),
            current_liabilities: Some(250.0),
            inventory: Some(100.0),
            total_debt: Some(400.0),
            operating_cash_flow: Some(300.0),
            investing_cash_flow: Some(-120.0),
            financing_cash_flow: Some(-80.0),
            capital_expenditures: Some(-90.0),
        }
    }

    fn company() -> CompanyInfo {
        let mut info = CompanyInfo::minimal(&Symbol::parse("TEST").unwrap());
        info.shares_outstanding = Some(100.0);
        info.dividend_rate = Some(1.0);
        info.beta = Some(1.1);
        info
    }

    #[test]
    fn test_ratios_from_statement() {
        let m = FundamentalAnalysisEngine::new().calculate(Some(&statement()), Some(&company()), Some(40.0));

        assert_eq!(m.gross_profit, Some(400.0));
        assert_relative_eq!(m.gross_margin.unwrap(), 40.0, epsilon = 1e-9);
        assert_relative_eq!(m.operating_margin.unwrap(), 25.0, epsilon = 1e-9);
        assert_relative_eq!(m.profit_margin.unwrap(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(m.return_on_equity.unwrap(), 25.0, epsilon = 1e-9);
        assert_relative_eq!(m.return_on_assets.unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(m.current_ratio.unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(m.quick_ratio.unwrap(), 1.6, epsilon = 1e-9);
        assert_relative_eq!(m.debt_to_equity.unwrap(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(m.debt_to_assets.unwrap(), 0.2, epsilon = 1e-9);
        assert_relative_eq!(m.asset_turnover.unwrap(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(m.inventory_turnover.unwrap(), 6.0, epsilon = 1e-9);
        assert_eq!(m.free_cash_flow, Some(210.0));
    }

    #[test]
    fn test_eps_and_valuation_fallbacks() {
        let m = FundamentalAnalysisEngine::new().calculate(Some(&statement()), Some(&company()), Some(40.0));

        // EPS from net income / shares, yield from dividend rate / price
        assert_relative_eq!(m.eps.unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(m.pe_ratio.unwrap(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(m.dividend_yield.unwrap(), 2.5, epsilon = 1e-9);
        assert_eq!(m.beta, Some(1.1));
    }

    #[test]
    fn test_provider_eps_preferred() {
        let mut info = company();
        info.trailing_eps = Some(4.0);
        info.dividend_yield = Some(0.01);
        let m = FundamentalAnalysisEngine::new().calculate(Some(&statement()), Some(&info), Some(40.0));

        assert_eq!(m.eps, Some(4.0));
        assert_relative_eq!(m.pe_ratio.unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(m.dividend_yield.unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_denominators_are_absent() {
        let mut s = statement();
        s.revenue = Some(0.0);
        s.stockholders_equity = Some(0.0);
        s.current_liabilities = Some(0.0);
        s.inventory = Some(0.0);

        let m = FundamentalAnalysisEngine::new().calculate(Some(&s), None, Some(40.0));
        assert!(m.gross_margin.is_none());
        assert!(m.profit_margin.is_none());
        assert!(m.return_on_equity.is_none());
        assert!(m.debt_to_equity.is_none());
        assert!(m.current_ratio.is_none());
        assert!(m.quick_ratio.is_none());
        assert!(m.inventory_turnover.is_none());
        assert!(m.return_on_assets.is_some());
    }

    #[test]
    fn test_negative_eps_has_no_pe() {
        let mut info = company();
        info.trailing_eps = Some(-1.5);
        let m = FundamentalAnalysisEngine::new().calculate(Some(&statement()), Some(&info), Some(40.0));
        assert_eq!(m.eps, Some(-1.5));
        assert!(m.pe_ratio.is_none());
    }

    #[test]
    fn test_missing_statement_keeps_company_facts() {
        let m = FundamentalAnalysisEngine::new().calculate(None, Some(&company()), Some(50.0));
        assert!(m.revenue.is_none());
        assert!(m.eps.is_none());
        assert_relative_eq!(m.dividend_yield.unwrap(), 2.0, epsilon = 1e-9);
    }
}
