//! # Customer Commands

use baht_core::{Customer, DigitString, CUSTOMER_SEARCH_LIMIT};

use super::persisted_note;
use crate::cli::CustomerCommand;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn run(state: &AppState, command: CustomerCommand) -> Result<String, ApiError> {
    match command {
        CustomerCommand::List { query: None } => list_customers(state).await,
        CustomerCommand::List { query: Some(query) } => search_customers(state, &query).await,
        CustomerCommand::Save {
            name,
            address,
            tax_id,
            phone,
            email,
        } => {
            let customer = Customer {
                id: String::new(),
                name,
                address,
                tax_id: DigitString::new(tax_id),
                phone: DigitString::new(phone),
                email,
            };
            save_customer(state, customer).await
        }
        CustomerCommand::Pull => pull_customers(state).await,
    }
}

pub async fn list_customers(state: &AppState) -> Result<String, ApiError> {
    let customers = state.db().customers().list().await?;
    if customers.is_empty() {
        return Ok("No customers".to_string());
    }
    Ok(render(&customers))
}

pub async fn search_customers(state: &AppState, query: &str) -> Result<String, ApiError> {
    let found = state
        .db()
        .customers()
        .search(query, CUSTOMER_SEARCH_LIMIT)
        .await?;
    if found.is_empty() {
        return Ok(format!("No customers match '{}'", query.trim()));
    }
    Ok(render(&found))
}

fn render(customers: &[Customer]) -> String {
    customers
        .iter()
        .map(|c| format!("{:<16} {:<14} {}", c.id, c.tax_id.as_str(), c.name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn save_customer(state: &AppState, customer: Customer) -> Result<String, ApiError> {
    let saved = state.sync.save_customer(customer).await?;
    Ok(format!(
        "Saved customer {} [{}] ({})",
        saved.value().name,
        saved.value().id,
        persisted_note(&saved)
    ))
}

pub async fn pull_customers(state: &AppState) -> Result<String, ApiError> {
    let count = state.sync.pull_customers().await?;
    Ok(format!("Pulled {} customers from remote", count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{local_state, state_with_remote};
    use crate::error::ErrorCode;

    fn customer(name: &str, tax_id: &str) -> Customer {
        Customer {
            name: name.to_string(),
            tax_id: DigitString::new(tax_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_matches_by_tax_id() {
        let state = local_state().await;
        save_customer(&state, customer("บริษัท เก่า จำกัด", "0105561234567"))
            .await
            .unwrap();
        let notice = save_customer(&state, customer("บริษัท ใหม่ จำกัด", "0105561234567"))
            .await
            .unwrap();

        assert!(notice.starts_with("Saved customer บริษัท ใหม่ จำกัด"));
        assert!(notice.ends_with("(local)"));
        assert_eq!(state.db().customers().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_rejects_blank_name() {
        let state = local_state().await;
        let err = save_customer(&state, customer("  ", "")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_pull_replaces_cache() {
        let (state, remote) = state_with_remote().await;
        save_customer(&state, customer("ลูกค้าท้องถิ่น", "")).await.unwrap();
        remote
            .seed_customers(vec![
                Customer {
                    id: "CUST-9".into(),
                    ..customer("ร้านป้าแดง", "3100100123456")
                },
                customer("บริษัท ทดสอบ จำกัด", "0105561234567"),
            ])
            .await;

        // the customer saved above was pushed too, so three rows come back
        let notice = pull_customers(&state).await.unwrap();
        assert_eq!(notice, "Pulled 3 customers from remote");

        let listed = list_customers(&state).await.unwrap();
        assert!(listed.contains("ร้านป้าแดง"));
    }

    #[tokio::test]
    async fn test_list_with_query() {
        let state = local_state().await;
        save_customer(&state, customer("Siam Trading", "0105561234567")).await.unwrap();
        save_customer(&state, customer("ร้านป้าแดง", "3100100123456")).await.unwrap();

        let found = run(&state, CustomerCommand::List { query: Some("siam".into()) })
            .await
            .unwrap();
        assert!(found.contains("Siam Trading"));
        assert!(!found.contains("ร้านป้าแดง"));

        let by_tax = search_customers(&state, "3100100").await.unwrap();
        assert!(by_tax.contains("ร้านป้าแดง"));

        assert_eq!(
            search_customers(&state, "ไม่มี").await.unwrap(),
            "No customers match 'ไม่มี'"
        );
    }

    #[tokio::test]
    async fn test_pull_without_remote() {
        let state = local_state().await;
        let err = pull_customers(&state).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
