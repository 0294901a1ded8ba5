// selected_tag and file_name hold comma-joined lists, see model::list_field.
pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS stores (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        visitation_status INTEGER NOT NULL DEFAULT 2,
        visit_date TEXT,
        selected_tag TEXT NOT NULL DEFAULT '',
        memo TEXT,
        business_hours TEXT,
        phone_number TEXT,
        address TEXT,
        file_name TEXT NOT NULL DEFAULT ''
    );

    CREATE INDEX IF NOT EXISTS idx_stores_status_date
        ON stores (visitation_status, visit_date DESC);

    CREATE INDEX IF NOT EXISTS idx_stores_name ON stores (name);

    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY,
        name TEXT UNIQUE NOT NULL
    );
";
