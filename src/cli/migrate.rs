use anyhow::{Result, anyhow};

use crate::core::db::{async_db, migrate_db};

pub async fn run(db: bool, db_path: &str) -> Result<()> {
    if !db {
        return Err(anyhow!("Missing value for migrate \"--db\""));
    }

    println!("Migrating db...");
    let db = async_db(db_path).await?;
    db.call(|conn| Ok(migrate_db(conn)?)).await?;
    println!("Finished migrating db");

    Ok(())
}
