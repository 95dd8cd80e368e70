//! Storefront tables and seed rows for database-backed tests.
//!
//! Mirrors the tables of `DeletionPlan::shop_default()` with real foreign
//! keys, so a wrong deletion order fails loudly.

use anyhow::Result;
use sqlx::PgPool;
use tracing::debug;

pub const SHOP_SCHEMA: &[&str] = &[
    "CREATE TABLE categories (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        parent_id INT REFERENCES categories(id)
    )",
    "CREATE TABLE customers (
        id SERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE products (
        id SERIAL PRIMARY KEY,
        category_id INT NOT NULL REFERENCES categories(id),
        name TEXT NOT NULL
    )",
    "CREATE TABLE addresses (
        id SERIAL PRIMARY KEY,
        customer_id INT NOT NULL REFERENCES customers(id),
        line1 TEXT NOT NULL
    )",
    "CREATE TABLE product_variants (
        id SERIAL PRIMARY KEY,
        product_id INT NOT NULL REFERENCES products(id),
        sku TEXT NOT NULL
    )",
    "CREATE TABLE carts (
        id SERIAL PRIMARY KEY,
        customer_id INT NOT NULL REFERENCES customers(id)
    )",
    "CREATE TABLE orders (
        id SERIAL PRIMARY KEY,
        customer_id INT NOT NULL REFERENCES customers(id),
        address_id INT REFERENCES addresses(id)
    )",
    "CREATE TABLE product_images (
        id SERIAL PRIMARY KEY,
        product_id INT NOT NULL REFERENCES products(id),
        url TEXT NOT NULL
    )",
    "CREATE TABLE reviews (
        id SERIAL PRIMARY KEY,
        customer_id INT NOT NULL REFERENCES customers(id),
        product_id INT NOT NULL REFERENCES products(id),
        rating INT NOT NULL
    )",
    "CREATE TABLE wishlist_items (
        id SERIAL PRIMARY KEY,
        customer_id INT NOT NULL REFERENCES customers(id),
        product_id INT NOT NULL REFERENCES products(id)
    )",
    "CREATE TABLE cart_items (
        id SERIAL PRIMARY KEY,
        cart_id INT NOT NULL REFERENCES carts(id),
        variant_id INT NOT NULL REFERENCES product_variants(id)
    )",
    "CREATE TABLE payments (
        id SERIAL PRIMARY KEY,
        order_id INT NOT NULL REFERENCES orders(id),
        amount_cents BIGINT NOT NULL
    )",
    "CREATE TABLE order_items (
        id SERIAL PRIMARY KEY,
        order_id INT NOT NULL REFERENCES orders(id),
        variant_id INT NOT NULL REFERENCES product_variants(id),
        quantity INT NOT NULL
    )",
];

const SEED: &[&str] = &[
    "INSERT INTO categories (name) VALUES ('Rings')",
    "INSERT INTO categories (name, parent_id) VALUES ('Engagement', 1)",
    "INSERT INTO customers (email) VALUES ('ada@example.com')",
    "INSERT INTO products (category_id, name) VALUES (2, 'Solitaire')",
    "INSERT INTO addresses (customer_id, line1) VALUES (1, '1 Gold St')",
    "INSERT INTO product_variants (product_id, sku) VALUES (1, 'SOL-18K')",
    "INSERT INTO carts (customer_id) VALUES (1)",
    "INSERT INTO orders (customer_id, address_id) VALUES (1, 1)",
    "INSERT INTO product_images (product_id, url) VALUES (1, 'solitaire.jpg')",
    "INSERT INTO reviews (customer_id, product_id, rating) VALUES (1, 1, 5)",
    "INSERT INTO wishlist_items (customer_id, product_id) VALUES (1, 1)",
    "INSERT INTO cart_items (cart_id, variant_id) VALUES (1, 1)",
    "INSERT INTO payments (order_id, amount_cents) VALUES (1, 129900)",
    "INSERT INTO order_items (order_id, variant_id, quantity) VALUES (1, 1, 1)",
];

/// Create the storefront tables in the pool's current schema.
pub async fn install_shop_schema(pool: &PgPool) -> Result<()> {
    for ddl in SHOP_SCHEMA {
        sqlx::query(ddl).execute(pool).await?;
    }
    debug!("Installed {} storefront tables", SHOP_SCHEMA.len());
    Ok(())
}

/// Insert one row per table, parents first.
pub async fn seed_shop(pool: &PgPool) -> Result<()> {
    for stmt in SEED {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}
