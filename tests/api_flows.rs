//! End-to-end flows against a real PostgreSQL. Each test registers its own
//! user, so runs can share one database. Set `TEST_DATABASE_URL` to enable.

mod common;

use common::{spawn_app, test_pool, Client};
use serde_json::{json, Value};

async fn client() -> Option<Client> {
    let pool = test_pool().await?;
    let addr = spawn_app(pool).await;
    Some(Client::register(addr).await)
}

async fn account(client: &Client, name: &str) -> i64 {
    client
        .create("/api/v1/accounts/accounts", json!({ "name": name }))
        .await["id"]
        .as_i64()
        .expect("account id")
}

async fn balance(client: &Client, id: i64) -> Value {
    let (status, body) = client
        .call("GET", &format!("/api/v1/accounts/accounts/{id}"), None)
        .await;
    assert_eq!(status, 200);
    body["current_balance"].clone()
}

#[tokio::test]
async fn session_lifecycle() {
    let Some(client) = client().await else { return };

    let (status, me) = client.call("GET", "/api/v1/users/check_auth", None).await;
    assert_eq!(status, 200);
    assert!(me["username"].as_str().is_some_and(|u| u.starts_with("user_")));
    assert!(me.get("password_hash").is_none());

    let (status, body) = client.call("POST", "/api/v1/users/logout", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Logout successful");

    let (status, _) = client.call("GET", "/api/v1/users/check_auth", None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn records_are_invisible_to_other_users() {
    let Some(pool) = test_pool().await else { return };
    let addr = spawn_app(pool).await;
    let owner = Client::register(addr).await;
    let stranger = Client::register(addr).await;

    let id = account(&owner, "Checking").await;
    let path = format!("/api/v1/accounts/accounts/{id}");

    let (status, _) = stranger.call("GET", &path, None).await;
    assert_eq!(status, 404);
    let (status, _) = stranger
        .call("PATCH", &path, Some(json!({ "name": "Mine now" })))
        .await;
    assert_eq!(status, 404);
    let (status, _) = stranger.call("DELETE", &path, None).await;
    assert_eq!(status, 404);

    let (status, listed) = stranger.call("GET", "/api/v1/accounts/accounts", None).await;
    assert_eq!(status, 200);
    assert_eq!(listed, json!([]));

    // referencing someone else's account is a field error, not a leak
    let (status, body) = stranger
        .call(
            "POST",
            "/api/v1/accounts/transactions",
            Some(json!({
                "transaction_type": "EXPENSE",
                "amount": "5.00",
                "occurred_at": "2025-01-02",
                "account_id": id,
            })),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"]["details"]["field_errors"]["account_id"].is_array());

    let (status, body) = owner.call("GET", &path, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Checking");
}

#[tokio::test]
async fn account_balance_follows_its_transactions() {
    let Some(client) = client().await else { return };
    let id = account(&client, "Main").await;

    let income = client
        .create(
            "/api/v1/accounts/transactions",
            json!({
                "transaction_type": "INCOME",
                "amount": "100.00",
                "occurred_at": "2025-02-01",
                "account_id": id,
            }),
        )
        .await;
    let expense = client
        .create(
            "/api/v1/accounts/transactions",
            json!({
                "transaction_type": "EXPENSE",
                "amount": "20.00",
                "occurred_at": "2025-02-03",
                "account_id": id,
            }),
        )
        .await;
    assert_eq!(balance(&client, id).await, "80.00");

    let expense_path = format!("/api/v1/accounts/transactions/{}", expense["id"]);
    let (status, updated) = client
        .call("PATCH", &expense_path, Some(json!({ "amount": "30.50" })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(updated["amount"], "30.50");
    assert_eq!(updated["account"]["name"], "Main");
    assert_eq!(balance(&client, id).await, "69.50");

    let income_path = format!("/api/v1/accounts/transactions/{}", income["id"]);
    let (status, _) = client.call("DELETE", &income_path, None).await;
    assert_eq!(status, 204);
    assert_eq!(balance(&client, id).await, "-30.50");

    let (status, _) = client.call("GET", &income_path, None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn tags_round_trip_through_transactions() {
    let Some(client) = client().await else { return };
    let id = account(&client, "Wallet").await;
    let tag = client
        .create("/api/v1/accounts/tags", json!({ "name": "trip" }))
        .await;

    let created = client
        .create(
            "/api/v1/accounts/transactions",
            json!({
                "transaction_type": "EXPENSE",
                "amount": "12.00",
                "occurred_at": "2025-03-10",
                "account_id": id,
                "description": "  Taxi ",
                "tag_ids": [tag["id"]],
                "need_review": true,
            }),
        )
        .await;
    assert_eq!(created["description"], "Taxi");
    assert_eq!(created["tags"][0]["name"], "trip");
    assert_eq!(created["origin"], "manual");

    let (status, page) = client
        .call("GET", "/api/v1/accounts/transactions/needing-review", None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["id"], created["id"]);

    // a PATCH that does not mention tags keeps them
    let path = format!("/api/v1/accounts/transactions/{}", created["id"]);
    let (status, patched) = client
        .call("PATCH", &path, Some(json!({ "need_review": false })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(patched["tags"].as_array().map(Vec::len), Some(1));

    let (_, page) = client
        .call("GET", "/api/v1/accounts/transactions/needing-review", None)
        .await;
    assert_eq!(page["count"], 0);

    let (status, _) = client
        .call("DELETE", &format!("/api/v1/accounts/tags/{}", tag["id"]), None)
        .await;
    assert_eq!(status, 204);
    let (_, after) = client.call("GET", &path, None).await;
    assert_eq!(after["tags"], json!([]));
}

#[tokio::test]
async fn deleting_a_category_hides_its_transactions() {
    let Some(client) = client().await else { return };
    let id = account(&client, "Main").await;
    let category = client
        .create(
            "/api/v1/accounts/categories",
            json!({ "name": "Food", "transaction_type": "expense" }),
        )
        .await;
    let subcategory = client
        .create(
            "/api/v1/accounts/subcategories",
            json!({ "category_id": category["id"], "name": "Groceries" }),
        )
        .await;
    client
        .create(
            "/api/v1/accounts/transactions",
            json!({
                "transaction_type": "EXPENSE",
                "amount": "45.10",
                "occurred_at": "2025-04-02",
                "account_id": id,
                "category_id": category["id"],
                "subcategory_id": subcategory["id"],
            }),
        )
        .await;

    let category_path = format!("/api/v1/accounts/categories/{}", category["id"]);
    let (status, detail) = client.call("GET", &category_path, None).await;
    assert_eq!(status, 200);
    assert_eq!(detail["subcategories"][0]["name"], "Groceries");

    let (status, _) = client.call("DELETE", &category_path, None).await;
    assert_eq!(status, 204);
    let (status, _) = client.call("GET", &category_path, None).await;
    assert_eq!(status, 404);
    let (status, _) = client
        .call(
            "GET",
            &format!("/api/v1/accounts/subcategories/{}", subcategory["id"]),
            None,
        )
        .await;
    assert_eq!(status, 404);

    let (_, page) = client.call("GET", "/api/v1/accounts/transactions", None).await;
    assert_eq!(page["count"], 0);
    let (_, page) = client
        .call("GET", "/api/v1/accounts/transactions?inactive_categories=true", None)
        .await;
    assert_eq!(page["count"], 1);

    // the name is free again once the old category is gone
    client
        .create(
            "/api/v1/accounts/categories",
            json!({ "name": "Food", "transaction_type": "expense" }),
        )
        .await;
}

#[tokio::test]
async fn bulk_update_is_all_or_nothing() {
    let Some(client) = client().await else { return };
    let id = account(&client, "Main").await;
    let mut ids = Vec::new();
    for amount in ["10.00", "20.00"] {
        let created = client
            .create(
                "/api/v1/accounts/transactions",
                json!({
                    "transaction_type": "EXPENSE",
                    "amount": amount,
                    "occurred_at": "2025-05-05",
                    "account_id": id,
                    "need_review": true,
                }),
            )
            .await;
        ids.push(created["id"].as_i64().expect("id"));
    }

    let (status, body) = client
        .call(
            "PATCH",
            "/api/v1/accounts/transactions/bulk-update",
            Some(json!({ "transactions": [
                { "id": ids[0], "amount": "11.00" },
                { "id": ids[1], "amount": "-1" },
            ]})),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(
        body["error"]["details"]["transaction_errors"][0]["transaction_id"],
        ids[1]
    );
    let (_, first) = client
        .call("GET", &format!("/api/v1/accounts/transactions/{}", ids[0]), None)
        .await;
    assert_eq!(first["amount"], "10.00");

    let (status, body) = client
        .call(
            "PATCH",
            "/api/v1/accounts/transactions/bulk-update",
            Some(json!({ "transactions": [
                { "id": ids[0], "need_review": false },
                { "id": 999_999_999, "need_review": false },
            ]})),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(
        body["error"]["details"]["missing_transaction_ids"],
        json!([999_999_999])
    );

    let (status, body) = client
        .call(
            "PATCH",
            "/api/v1/accounts/transactions/bulk-update",
            Some(json!({ "transactions": [
                { "id": ids[0], "need_review": false },
                { "id": ids[1], "need_review": false, "amount": "25.00" },
            ]})),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["updated_count"], 2);
    assert_eq!(balance(&client, id).await, "-35.00");
}

#[tokio::test]
async fn card_installments_split_across_bills() {
    let Some(client) = client().await else { return };
    let card = client
        .create(
            "/api/v1/accounts/credit-cards",
            json!({ "name": "Visa", "close_day": 5, "due_day": 15, "credit_limit": "1000.00" }),
        )
        .await;

    let plan = client
        .create(
            "/api/v1/accounts/installments",
            json!({
                "transaction_type": "EXPENSE",
                "principal": "100.00",
                "installments": 3,
                "occurred_at": "2025-01-10",
                "credit_card_id": card["id"],
                "description": "Headphones",
            }),
        )
        .await;
    assert_eq!(plan["principal"], "100.00");
    assert_eq!(plan["installments_total"], 3);
    let parts = plan["installments"].as_array().expect("installments");
    let amounts: Vec<&Value> = parts.iter().map(|p| &p["amount"]).collect();
    assert_eq!(amounts, ["33.34", "33.33", "33.33"]);
    let charges: Vec<&Value> = parts.iter().map(|p| &p["charge_at_card"]).collect();
    assert_eq!(charges, ["2025-02-15", "2025-03-15", "2025-04-15"]);
    assert!(parts.iter().all(|p| p["occurred_at"] == "2025-01-10"));

    let (status, bill) = client
        .call(
            "GET",
            &format!("/api/v1/accounts/credit-cards/{}/bill?year=2025&month=2", card["id"]),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(bill["total"], "33.34");
    assert_eq!(bill["due_date"], "2025-02-15");
    assert_eq!(bill["close_date"], "2025-02-05");
    assert_eq!(bill["available_limit"], "900.00");

    let group = plan["installment_group_id"].as_str().expect("group id");
    let path = format!("/api/v1/accounts/installments/{group}");
    let (status, fetched) = client.call("GET", &path, None).await;
    assert_eq!(status, 200);
    assert_eq!(fetched["principal"], "100.00");

    let (status, _) = client.call("DELETE", &path, None).await;
    assert_eq!(status, 204);
    let (status, _) = client.call("GET", &path, None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn cash_flow_report_nets_groups_into_results() {
    let Some(client) = client().await else { return };
    let id = account(&client, "Main").await;
    let salary = client
        .create(
            "/api/v1/accounts/categories",
            json!({ "name": "Salary", "transaction_type": "income" }),
        )
        .await;
    let food = client
        .create(
            "/api/v1/accounts/categories",
            json!({ "name": "Food", "transaction_type": "expense" }),
        )
        .await;
    for (kind, amount, category) in [
        ("INCOME", "1000.00", &salary["id"]),
        ("EXPENSE", "250.50", &food["id"]),
    ] {
        client
            .create(
                "/api/v1/accounts/transactions",
                json!({
                    "transaction_type": kind,
                    "amount": amount,
                    "occurred_at": "2025-03-12",
                    "account_id": id,
                    "category_id": category,
                }),
            )
            .await;
    }

    let view = client
        .create(
            "/api/v1/accounts/cash-flow-views",
            json!({
                "name": "Budget",
                "groups": [
                    { "name": "Income", "position": 0, "category_ids": [salary["id"]] },
                    { "name": "Expenses", "position": 1, "category_ids": [food["id"]] },
                ],
                "results": [{ "name": "Net", "position": 2 }],
            }),
        )
        .await;
    assert_eq!(view["groups"].as_array().map(Vec::len), Some(2));

    let report_path = format!("/api/v1/accounts/cash-flow-views/{}/report", view["id"]);
    let (status, _) = client.call("GET", &report_path, None).await;
    assert_eq!(status, 400);

    let (status, report) = client
        .call("GET", &format!("{report_path}?year=2025"), None)
        .await;
    assert_eq!(status, 200);
    let items = report["items"].as_array().expect("items");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["type"], "group");
    assert_eq!(items[0]["annual_total"], "1000.00");
    assert_eq!(items[1]["annual_total"], "-250.50");
    assert_eq!(items[2]["type"], "result");
    assert_eq!(items[2]["monthly_totals"]["3"], "749.50");
    assert_eq!(items[2]["annual_total"], "749.50");

    let (status, body) = client
        .call(
            "POST",
            "/api/v1/accounts/cash-flow-views",
            Some(json!({
                "name": "Broken",
                "groups": [{ "name": "Ghost", "position": 0, "category_ids": [999_999_999] }],
            })),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"]["details"]["field_errors"]["groups"].is_array());
}

#[tokio::test]
async fn fresh_account_balance_has_two_places() {
    let Some(client) = client().await else { return };
    let created = client
        .create("/api/v1/accounts/accounts", json!({ "name": "Savings" }))
        .await;
    assert_eq!(created["current_balance"], "0.00");
    let id = created["id"].as_i64().expect("account id");
    assert_eq!(balance(&client, id).await, "0.00");

    let (_, listed) = client.call("GET", "/api/v1/accounts/accounts", None).await;
    assert_eq!(listed[0]["current_balance"], "0.00");
}

#[tokio::test]
async fn deleting_a_funding_source_removes_its_transactions() {
    let Some(client) = client().await else { return };
    let id = account(&client, "Closing").await;
    let card = client
        .create(
            "/api/v1/accounts/credit-cards",
            json!({ "name": "Old card", "close_day": 1, "due_day": 10 }),
        )
        .await;

    let on_account = client
        .create(
            "/api/v1/accounts/transactions",
            json!({
                "transaction_type": "EXPENSE",
                "amount": "15.00",
                "occurred_at": "2025-06-01",
                "account_id": id,
            }),
        )
        .await;
    let on_card = client
        .create(
            "/api/v1/accounts/transactions",
            json!({
                "transaction_type": "EXPENSE",
                "amount": "42.00",
                "occurred_at": "2025-06-02",
                "credit_card_id": card["id"],
            }),
        )
        .await;

    let (status, _) = client
        .call("DELETE", &format!("/api/v1/accounts/accounts/{id}"), None)
        .await;
    assert_eq!(status, 204);
    let (status, _) = client
        .call(
            "GET",
            &format!("/api/v1/accounts/transactions/{}", on_account["id"]),
            None,
        )
        .await;
    assert_eq!(status, 404);

    let (status, _) = client
        .call(
            "DELETE",
            &format!("/api/v1/accounts/credit-cards/{}", card["id"]),
            None,
        )
        .await;
    assert_eq!(status, 204);
    let (status, _) = client
        .call(
            "GET",
            &format!("/api/v1/accounts/transactions/{}", on_card["id"]),
            None,
        )
        .await;
    assert_eq!(status, 404);

    let (_, page) = client.call("GET", "/api/v1/accounts/transactions", None).await;
    assert_eq!(page["count"], 0);
}

#[tokio::test]
async fn moving_a_transaction_reverts_the_old_balance() {
    let Some(client) = client().await else { return };
    let from = account(&client, "From").await;
    let to = account(&client, "To").await;
    let card = client
        .create(
            "/api/v1/accounts/credit-cards",
            json!({ "name": "Master", "close_day": 20, "due_day": 28 }),
        )
        .await;

    let created = client
        .create(
            "/api/v1/accounts/transactions",
            json!({
                "transaction_type": "EXPENSE",
                "amount": "10.00",
                "occurred_at": "2025-07-01",
                "account_id": from,
            }),
        )
        .await;
    assert_eq!(balance(&client, from).await, "-10.00");
    let path = format!("/api/v1/accounts/transactions/{}", created["id"]);

    let (status, moved) = client
        .call("PATCH", &path, Some(json!({ "account_id": to })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(moved["account"]["name"], "To");
    assert_eq!(balance(&client, from).await, "0.00");
    assert_eq!(balance(&client, to).await, "-10.00");

    let (status, moved) = client
        .call(
            "PATCH",
            &path,
            Some(json!({ "account_id": null, "credit_card_id": card["id"] })),
        )
        .await;
    assert_eq!(status, 200);
    assert!(moved["account"].is_null());
    assert_eq!(moved["credit_card"]["name"], "Master");
    assert!(moved["charge_at_card"].is_string());
    assert_eq!(balance(&client, to).await, "0.00");

    // a full rewrite back onto an account books it there again
    let (status, _) = client
        .call(
            "PUT",
            &path,
            Some(json!({
                "transaction_type": "INCOME",
                "amount": "7.25",
                "occurred_at": "2025-07-02",
                "account_id": from,
            })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(balance(&client, from).await, "7.25");
    assert_eq!(balance(&client, to).await, "0.00");
}

#[tokio::test]
async fn deactivating_a_category_retires_its_subcategories() {
    let Some(client) = client().await else { return };
    for method in ["PATCH", "PUT"] {
        let category = client
            .create(
                "/api/v1/accounts/categories",
                json!({ "name": format!("Leisure {method}"), "transaction_type": "expense" }),
            )
            .await;
        let subcategory = client
            .create(
                "/api/v1/accounts/subcategories",
                json!({ "category_id": category["id"], "name": "Cinema" }),
            )
            .await;

        let body = if method == "PATCH" {
            json!({ "is_active": false })
        } else {
            json!({
                "name": format!("Leisure {method}"),
                "transaction_type": "expense",
                "is_active": false,
            })
        };
        let category_path = format!("/api/v1/accounts/categories/{}", category["id"]);
        let (status, updated) = client.call(method, &category_path, Some(body)).await;
        assert_eq!(status, 200, "{method}: {updated}");
        assert_eq!(updated["is_active"], false);

        let (status, _) = client
            .call(
                "GET",
                &format!("/api/v1/accounts/subcategories/{}", subcategory["id"]),
                None,
            )
            .await;
        assert_eq!(status, 404, "{method}");
    }

    let (status, listed) = client.call("GET", "/api/v1/accounts/subcategories", None).await;
    assert_eq!(status, 200);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn installment_plans_report_every_missing_field() {
    let Some(client) = client().await else { return };
    let id = account(&client, "Main").await;
    let (status, body) = client
        .call(
            "POST",
            "/api/v1/accounts/installments",
            Some(json!({
                "transaction_type": "EXPENSE",
                "occurred_at": "2025-08-01",
                "account_id": id,
            })),
        )
        .await;
    assert_eq!(status, 400);
    let fields = &body["error"]["details"]["field_errors"];
    assert_eq!(fields["principal"], json!(["This field is required."]));
    assert_eq!(fields["installments"], json!(["This field is required."]));
    assert!(fields.get("amount").is_none());
}

const BANK_STATEMENT: &str = "Extrato Conta Corrente\n\
Conta ;12345678\n\
Período ;01/03/2025 a 31/03/2025\n\
Saldo ;0,00\n\
\n\
Data Lançamento;Descrição;Valor;Saldo\n\
05/03/2025;Pix recebido;1.500,00;1.500,00\n\
06/03/2025;Mercado;-89,90;1.410,10\n\
07/03/2025;Tarifa;xx;1.410,10\n";

const CARD_STATEMENT: &str = "Data,Lançamento,Categoria,Tipo,Valor\n\
02/03/2025,PADARIA,RESTAURANTES,Compra à vista,\"R$ 38,50\"\n\
05/03/2025,ESTORNO,COMPRAS,Estorno,\"-R$ 13,94\"\n";

#[tokio::test]
async fn statement_import_books_rows_for_review() {
    let Some(client) = client().await else { return };
    let id = account(&client, "Inter").await;
    let import = "/api/v1/accounts/transactions/import-report";

    let (status, report) = client
        .upload(
            &format!("{import}?file_name=extrato.csv&account_id={id}"),
            BANK_STATEMENT,
        )
        .await;
    assert_eq!(status, 201, "{report}");
    assert_eq!(report["handler_type"], "banco_inter_bank_statement");
    assert_eq!(report["status"], "FAILED");
    assert_eq!(report["success_count"], 2);
    assert_eq!(report["error_count"], 1);
    assert_eq!(report["errors"], json!(["Row 9: Invalid amount format: xx"]));
    assert_eq!(
        report["failed_reason"],
        "Import completed with 1 errors. See errors list for details."
    );
    assert_eq!(balance(&client, id).await, "1410.10");

    let (_, page) = client
        .call("GET", "/api/v1/accounts/transactions/needing-review", None)
        .await;
    assert_eq!(page["count"], 2);
    let rows = page["results"].as_array().expect("results");
    assert!(rows.iter().all(|t| t["origin"] == "extrato.csv"));

    let card = client
        .create(
            "/api/v1/accounts/credit-cards",
            json!({ "name": "Inter Black", "close_day": 25, "due_day": 5 }),
        )
        .await;
    let (status, card_report) = client
        .upload(
            &format!("{import}?file_name=fatura.csv&credit_card_id={}", card["id"]),
            CARD_STATEMENT,
        )
        .await;
    assert_eq!(status, 201, "{card_report}");
    assert_eq!(card_report["status"], "IMPORTED");
    assert_eq!(card_report["success_count"], 2);
    assert_eq!(card_report["credit_card_id"], card["id"]);

    let (_, page) = client
        .call(
            "GET",
            &format!("/api/v1/accounts/transactions?credit_card_id={}", card["id"]),
            None,
        )
        .await;
    assert_eq!(page["count"], 2);
    let mut kinds: Vec<&str> = page["results"]
        .as_array()
        .expect("results")
        .iter()
        .filter_map(|t| t["transaction_type"].as_str())
        .collect();
    kinds.sort_unstable();
    assert_eq!(kinds, ["EXPENSE", "INCOME"]);

    let (status, unknown) = client
        .upload(
            &format!("{import}?file_name=other.csv&account_id={id}"),
            "date,amount\n2025-03-01,10.00\n",
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(unknown["status"], "FAILED");
    assert_eq!(unknown["success_count"], 0);
    assert_eq!(
        unknown["failed_reason"],
        "The file does not match any supported statement layout."
    );

    let (status, listed) = client.call("GET", "/api/v1/accounts/import-reports", None).await;
    assert_eq!(status, 200);
    assert_eq!(listed.as_array().map(Vec::len), Some(3));
    assert_eq!(listed[0]["id"], unknown["id"]);

    let (status, fetched) = client
        .call(
            "GET",
            &format!("/api/v1/accounts/import-reports/{}", report["id"]),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(fetched["file_name"], "extrato.csv");

    let (status, body) = client
        .upload(&format!("{import}?file_name=notes.txt&account_id={id}"), "x")
        .await;
    assert_eq!(status, 400);
    assert!(body["error"]["details"]["field_errors"]["file_name"].is_array());

    let (status, body) = client
        .upload(&format!("{import}?file_name=a.csv&account_id=999999999"), "x")
        .await;
    assert_eq!(status, 400);
    assert!(body["error"]["details"]["field_errors"]["account_id"].is_array());
}
