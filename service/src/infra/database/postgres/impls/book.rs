//! [`Book`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{book, Book},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Builds a [`Book`] out of the provided [`Row`].
fn from_row(row: &Row) -> Book {
    Book {
        id: row.get("id"),
        title: row.get("title"),
        amount: row.get("amount"),
        is_retired: row.get("is_retired"),
    }
}

impl<C> Database<Select<By<Option<Book>, book::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Book>, book::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: book::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, title, amount, is_retired \
            FROM books \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Book>, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Book>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT id, title, amount, is_retired \
            FROM books \
            ORDER BY title, id";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Book>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(book): Insert<Book>,
    ) -> Result<Self::Ok, Self::Err> {
        let Book {
            id,
            title,
            amount,
            is_retired,
        } = book;

        const SQL: &str = "\
            INSERT INTO books (id, title, amount, is_retired) \
            VALUES ($1::UUID, $2::VARCHAR, $3::INT4, $4::BOOL)";
        self.exec(SQL, &[&id, &title, &amount, &is_retired])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Book>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(book): Update<Book>,
    ) -> Result<Self::Ok, Self::Err> {
        let Book {
            id,
            title,
            amount,
            is_retired,
        } = book;

        const SQL: &str = "\
            UPDATE books \
            SET title = $2::VARCHAR, \
                amount = $3::INT4, \
                is_retired = $4::BOOL \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &title, &amount, &is_retired])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Book, book::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Book, book::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: book::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM books \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
