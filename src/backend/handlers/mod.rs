pub mod accounts;
pub mod cash_flow;
pub mod categories;
pub mod credit_cards;
pub mod imports;
pub mod installments;
pub mod subcategories;
pub mod tags;
pub mod transactions;
pub mod users;

use sqlx::PgConnection;

use crate::database::db::queries::{accounts as account_queries, categories as category_queries};
use crate::database::db::queries::{credit_cards as card_queries, tags as tag_queries};
use crate::database::models::{NewTransaction, Transaction};
use crate::error::FieldErrors;

fn does_not_exist(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Database-side checks of a transaction write: every referenced record must
/// be owned by the caller, and newly chosen ones must still be active. Fills
/// in `charge_at_card` from the card's billing cycle when it is missing.
///
/// References the row already had are accepted even when inactive, so old
/// transactions stay editable after a category or card is retired.
pub(crate) async fn check_references(
    conn: &mut PgConnection,
    user_id: i64,
    t: &mut NewTransaction,
    current: Option<&Transaction>,
) -> Result<FieldErrors, sqlx::Error> {
    let mut errors = FieldErrors::new();
    let changed = |stored: Option<i64>, chosen: i64| current.map_or(true, |_| stored != Some(chosen));

    if let Some(id) = t.account_id {
        match account_queries::get_account(&mut *conn, user_id, id).await? {
            None => errors.add("account_id", does_not_exist(id)),
            Some(account) if !account.is_active && changed(current.and_then(|c| c.account_id), id) => {
                errors.add("account_id", "This account is inactive.")
            }
            Some(_) => {}
        }
    }

    if let Some(id) = t.credit_card_id {
        match card_queries::get_credit_card(&mut *conn, user_id, id).await? {
            None => errors.add("credit_card_id", does_not_exist(id)),
            Some(card)
                if !card.is_active && changed(current.and_then(|c| c.credit_card_id), id) =>
            {
                errors.add("credit_card_id", "This credit card is inactive.")
            }
            Some(card) => {
                if t.charge_at_card.is_none() {
                    let index = u32::try_from(t.installment_number - 1).unwrap_or(0);
                    t.charge_at_card = Some(
                        card.billing_cycle()
                            .installment_charge_date(t.occurred_at, index),
                    );
                }
            }
        }
    }

    if let Some(id) = t.category_id {
        match category_queries::get_category(&mut *conn, user_id, id).await? {
            None => errors.add("category_id", does_not_exist(id)),
            Some(category)
                if !category.is_active && changed(current.and_then(|c| c.category_id), id) =>
            {
                errors.add("category_id", "This category is inactive.")
            }
            Some(_) => {}
        }
    }

    if let Some(id) = t.subcategory_id {
        match category_queries::get_subcategory(&mut *conn, user_id, id).await? {
            None => errors.add("subcategory_id", does_not_exist(id)),
            Some(sub) if Some(sub.category_id) != t.category_id => errors.add(
                "subcategory_id",
                "Subcategory must belong to the selected category.",
            ),
            Some(sub)
                if !sub.is_active && changed(current.and_then(|c| c.subcategory_id), id) =>
            {
                errors.add("subcategory_id", "This subcategory is inactive.")
            }
            Some(_) => {}
        }
    }

    for id in tag_queries::foreign_tag_ids(&mut *conn, user_id, &t.tag_ids).await? {
        errors.add("tag_ids", does_not_exist(id));
    }

    Ok(errors)
}
