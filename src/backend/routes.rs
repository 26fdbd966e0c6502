use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::backend::handlers::{
    accounts, cash_flow, categories, credit_cards, imports, installments, subcategories, tags,
    transactions, users,
};
use crate::backend::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/users", post(users::register))
        .route("/api/v1/users/login", post(users::login))
        .route("/api/v1/users/logout", post(users::logout))
        .route("/api/v1/users/check_auth", get(users::check_auth))
        .nest("/api/v1/accounts", finance_routes())
}

fn finance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/accounts/:id",
            get(accounts::get_account)
                .put(accounts::replace_account)
                .patch(accounts::patch_account)
                .delete(accounts::delete_account),
        )
        .route(
            "/credit-cards",
            get(credit_cards::list_credit_cards).post(credit_cards::create_credit_card),
        )
        .route(
            "/credit-cards/:id",
            get(credit_cards::get_credit_card)
                .put(credit_cards::replace_credit_card)
                .patch(credit_cards::patch_credit_card)
                .delete(credit_cards::delete_credit_card),
        )
        .route("/credit-cards/:id/bill", get(credit_cards::get_bill))
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::replace_category)
                .patch(categories::patch_category)
                .delete(categories::delete_category),
        )
        .route(
            "/categories/:id/subcategories",
            get(categories::list_category_subcategories),
        )
        .route(
            "/subcategories",
            get(subcategories::list_subcategories).post(subcategories::create_subcategory),
        )
        .route(
            "/subcategories/:id",
            get(subcategories::get_subcategory)
                .put(subcategories::replace_subcategory)
                .patch(subcategories::patch_subcategory)
                .delete(subcategories::delete_subcategory),
        )
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/:id", delete(tags::delete_tag))
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/transactions/bulk-update",
            patch(transactions::bulk_update),
        )
        .route(
            "/transactions/needing-review",
            get(transactions::needing_review),
        )
        .route(
            "/transactions/import-report",
            post(imports::import_statement),
        )
        .route(
            "/transactions/:id",
            get(transactions::get_transaction)
                .put(transactions::replace_transaction)
                .patch(transactions::patch_transaction)
                .delete(transactions::delete_transaction),
        )
        .route("/import-reports", get(imports::list_reports))
        .route("/import-reports/:id", get(imports::get_report))
        .route("/installments", post(installments::create_plan))
        .route(
            "/installments/:group_id",
            get(installments::get_plan).delete(installments::delete_plan),
        )
        .route(
            "/cash-flow-views",
            get(cash_flow::list_views).post(cash_flow::create_view),
        )
        .route(
            "/cash-flow-views/:id",
            get(cash_flow::get_view)
                .put(cash_flow::replace_view)
                .delete(cash_flow::delete_view),
        )
        .route("/cash-flow-views/:id/report", get(cash_flow::get_report))
}
