//! Two-tab demo for the todo-lists state engine.
//!
//! Starts two instances sharing one storage directory and one sync channel,
//! edits from both, and prints the converged state.

use std::sync::Arc;
use std::time::Duration;
use todo_lists::{AppConfig, FileStorage, LocalHub, TodoApp, TodoItem};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn converge(a: &TodoApp, b: &TodoApp) -> bool {
    for _ in 0..100 {
        if a.snapshot().await == b.snapshot().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn print_tab(label: &str, state: &todo_lists::AppState) {
    println!("{label} (theme: {})", state.theme);
    for (index, list) in state.todo_lists.iter().enumerate() {
        println!(
            "  {index}. {} [{}/{} done]",
            list.name,
            list.completed_count(),
            list.todos.len()
        );
        for todo in &list.todos {
            let status = if todo.is_done { "✓" } else { " " };
            println!("     [{status}] {} ({})", todo.title, todo.date);
            for sub in &todo.sub_todos {
                println!("         - {}", sub.title);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Todo Lists: two tabs ===\n");

    let storage = Arc::new(FileStorage::new(&config.data_dir));
    let hub = LocalHub::new(config.sync_capacity);

    let tab_a = TodoApp::start(
        config.clone(),
        storage.clone(),
        Arc::new(hub.channel(&config.sync_channel)),
    )
    .await?;
    let tab_b = TodoApp::start(
        config.clone(),
        storage,
        Arc::new(hub.channel(&config.sync_channel)),
    )
    .await?;

    println!(">>> Tab A: add a list with two items");
    tab_a.add_untitled_list().await?;
    let list_index = tab_a.todo_lists().await.len() - 1;
    tab_a.add_item(list_index, TodoItem::dated_now("Milk")).await?;
    tab_a.add_default_item(list_index).await?;

    if !converge(&tab_a, &tab_b).await {
        println!("Tabs did not converge");
    }

    println!(">>> Tab B: complete the first item, add a sub-item, toggle theme");
    tab_b.toggle_done(list_index, 0).await?;
    tab_b
        .add_sub_item(list_index, 1, TodoItem::dated_now("Check the fridge"))
        .await?;
    tab_b.toggle_theme().await?;

    if !converge(&tab_a, &tab_b).await {
        println!("Tabs did not converge");
    }

    println!();
    print_tab("Tab A", &tab_a.snapshot().await);
    print_tab("Tab B", &tab_b.snapshot().await);

    let timeout = Duration::from_secs(5);
    tab_a.shutdown(timeout).await?;
    tab_b.shutdown(timeout).await?;

    println!(
        "\nState persisted under {}",
        config.data_dir.display()
    );
    println!("\n=== Demo Complete ===");
    Ok(())
}
