//! [`Order`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{order, user, Order},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of the `orders` table, in the order they're bound on writes.
const COLUMNS: &str = "\
    id, book_id, user_id, rental_kind, \
    start_date, due_date, return_date, state";

/// Builds an [`Order`] out of the provided [`Row`].
fn from_row(row: &Row) -> Order {
    Order {
        id: row.get("id"),
        book_id: row.get("book_id"),
        user_id: row.get("user_id"),
        rental_kind: row.get("rental_kind"),
        start_date: row.get("start_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        state: row.get("state"),
    }
}

impl<C> Database<Select<By<Option<Order>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: order::Id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM orders WHERE id = $1::UUID");
        Ok(self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Order>, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Order>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!("SELECT {COLUMNS} FROM orders ORDER BY start_date, id");
        Ok(self
            .query(sql.as_str(), &[])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Order>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Order>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM orders \
             WHERE user_id = $1::UUID \
             ORDER BY start_date, id",
        );
        Ok(self
            .query(sql.as_str(), &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Order>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(order): Insert<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        let Order {
            id,
            book_id,
            user_id,
            rental_kind,
            start_date,
            due_date,
            return_date,
            state,
        } = order;

        let sql = format!(
            "INSERT INTO orders ({COLUMNS}) \
             VALUES ($1::UUID, $2::UUID, $3::UUID, $4::INT2, \
                     $5::DATE, $6::DATE, $7::DATE, $8::INT2)",
        );
        self.exec(
            sql.as_str(),
            &[
                &id,
                &book_id,
                &user_id,
                &rental_kind,
                &start_date,
                &due_date,
                &return_date,
                &state,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Order>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(order): Update<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        // Book, user, rental kind and dates of placement never change.
        let Order {
            id,
            return_date,
            state,
            ..
        } = order;

        const SQL: &str = "\
            UPDATE orders \
            SET return_date = $2::DATE, \
                state = $3::INT2 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &return_date, &state])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Order, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Order, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: order::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM orders \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
