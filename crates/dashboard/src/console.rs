//! Line-oriented operator console.
//!
//! Parses operator input into [`ConsoleCommand`]s and renders the active view
//! of a [`SessionSnapshot`] as plain text.

use std::fmt::Write;

use recommender_core::{InteractionKind, Product, ProductId, Recommendation, ViewSelector};

use crate::session::{Resource, SessionSnapshot};

pub const HELP: &str = "\
Commands:
  user <id>                     switch identity (`user` alone clears it)
  random                        switch to a random identity
  view explore|recommendations|profile
  track <product_id> view|purchase
  show                          redraw the active view
  help                          show this help
  quit                          end the session";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Replace the identity with raw input (empty clears it).
    User(String),
    Random,
    View(ViewSelector),
    Track {
        product_id: ProductId,
        kind: InteractionKind,
    },
    Show,
    Help,
    Quit,
}

impl std::str::FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        match (verb, args.as_slice()) {
            ("user", []) => Ok(Self::User(String::new())),
            ("user", [id]) => Ok(Self::User((*id).to_string())),
            ("random", []) => Ok(Self::Random),
            ("view", [view]) => view.parse().map(Self::View),
            ("track", [product_id, kind]) => Ok(Self::Track {
                product_id: ProductId::new(*product_id),
                kind: kind.parse()?,
            }),
            ("show", []) => Ok(Self::Show),
            ("help", []) => Ok(Self::Help),
            ("quit" | "exit", []) => Ok(Self::Quit),
            _ => Err(format!("unrecognized command: {line}")),
        }
    }
}

/// Render the header, tab bar and active view of `snapshot`.
#[must_use]
pub fn render(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    let user = snapshot
        .identity
        .as_ref()
        .map_or("<none>", |identity| identity.as_str());
    let _ = writeln!(out, "== Product Recommender == user: {user}");

    let tabs: Vec<String> = ViewSelector::ALL
        .iter()
        .map(|view| {
            if *view == snapshot.view {
                format!("[{}]", view.title())
            } else {
                view.title().to_string()
            }
        })
        .collect();
    let _ = writeln!(out, "{}", tabs.join("  "));

    for failure in &snapshot.failures {
        let _ = writeln!(out, "! {} unavailable: {}", failure.resource, failure.message);
    }
    out.push('\n');

    match snapshot.view {
        ViewSelector::Explore => render_catalog(snapshot, &mut out),
        ViewSelector::Recommendations => render_recommendations(snapshot, &mut out),
        ViewSelector::Profile => render_profile(snapshot, &mut out),
    }
    out
}

fn render_catalog(snapshot: &SessionSnapshot, out: &mut String) {
    let _ = writeln!(out, "Product Catalog");
    if snapshot.catalog.is_empty() {
        let message = if snapshot.failure(Resource::Catalog).is_some() {
            "Catalog could not be loaded."
        } else {
            "No products yet."
        };
        let _ = writeln!(out, "  {message}");
        return;
    }
    for product in &snapshot.catalog {
        let _ = writeln!(
            out,
            "  {:<6} {:<24} {:>9}  {}  [{}]",
            product.id,
            product.name,
            product.price.to_string(),
            product.category,
            tag_list(product)
        );
    }
}

fn tag_list(product: &Product) -> String {
    let tags: Vec<&str> = product.tags.iter().map(String::as_str).collect();
    tags.join(", ")
}

fn render_recommendations(snapshot: &SessionSnapshot, out: &mut String) {
    let _ = writeln!(out, "Personalized Recommendations");
    if snapshot.identity.is_none() {
        let _ = writeln!(out, "  No user selected.");
        return;
    }
    if snapshot.loading {
        let _ = writeln!(out, "  Loading recommendations...");
        return;
    }
    if snapshot.recommendations.is_empty() {
        let _ = writeln!(
            out,
            "  No recommendations yet. View or purchase products to get started."
        );
        return;
    }
    for (rank, rec) in snapshot.recommendations.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {} {} ({}) {} - {}  [{}]",
            Recommendation::rank_label(rank),
            rec.product.name,
            rec.product.id,
            rec.product.category,
            rec.product.price,
            tag_list(&rec.product)
        );
        let _ = writeln!(out, "      {}", rec.explanation);
    }
}

fn render_profile(snapshot: &SessionSnapshot, out: &mut String) {
    let _ = writeln!(out, "User Profile");
    if snapshot.identity.is_none() {
        let _ = writeln!(out, "  No user selected.");
        return;
    }
    let Some(profile) = &snapshot.profile else {
        let _ = writeln!(out, "  Loading profile...");
        return;
    };

    let _ = writeln!(
        out,
        "  Products viewed: {}  Purchases: {}",
        profile.viewed_count, profile.purchase_count
    );

    let _ = writeln!(out, "  Favorite categories:");
    if profile.has_category_activity() {
        for (category, count) in profile.ranked_categories() {
            let _ = writeln!(out, "    {category:<16} {count}");
        }
    } else {
        let _ = writeln!(out, "    No category preferences yet");
    }

    if !profile.purchased_products.is_empty() {
        let _ = writeln!(out, "  Purchased: {}", profile.purchased_products.join(", "));
    }
    if !profile.viewed_products.is_empty() {
        let _ = writeln!(out, "  Recently viewed: {}", profile.viewed_products.join(", "));
    }
}
