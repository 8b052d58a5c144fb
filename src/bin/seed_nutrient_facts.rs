//! Utility to seed the nutrient fact table with common daycare foods
//!
//! Values follow the Brazilian food composition table (TACO) and are
//! idempotent: running the seeder twice updates rows in place.

use menuplan::config::Config;
use menuplan::db::{self, Database};
use menuplan::models::{FactBasis, NutrientFact, NutrientFactCreate, NutritionTotals};
use menuplan::models::FactBasis::{Per100g, Per100ml, PerUnit};

struct SeedFood {
    name: &'static str,
    basis: FactBasis,
    portion_grams: Option<f64>,
    // energy, protein, lipid, carbohydrate, fiber, calcium, iron, sodium, vitamin_c, vitamin_a
    values: [f64; 10],
}

const fn food(name: &'static str, basis: FactBasis, portion_grams: Option<f64>, values: [f64; 10]) -> SeedFood {
    SeedFood { name, basis, portion_grams, values }
}

const FOODS: &[SeedFood] = &[
    food("arroz branco cozido", Per100g, Some(100.0), [128.0, 2.5, 0.2, 28.1, 1.6, 4.0, 0.1, 1.0, 0.0, 0.0]),
    food("feijao carioca cozido", Per100g, Some(80.0), [76.0, 4.8, 0.5, 13.6, 8.5, 27.0, 1.3, 2.0, 0.0, 0.0]),
    food("feijao preto cozido", Per100g, Some(80.0), [77.0, 4.5, 0.5, 14.0, 8.4, 29.0, 1.5, 2.0, 0.0, 0.0]),
    food("frango peito grelhado", Per100g, Some(80.0), [159.0, 32.0, 2.5, 0.0, 0.0, 5.0, 0.3, 50.0, 0.0, 0.0]),
    food("carne bovina moida cozida", Per100g, Some(80.0), [212.0, 26.7, 10.9, 0.0, 0.0, 4.0, 2.6, 53.0, 0.0, 0.0]),
    food("merluza assada", Per100g, Some(80.0), [122.0, 26.6, 0.9, 0.0, 0.0, 20.0, 0.2, 80.0, 0.0, 0.0]),
    food("ovo cozido", PerUnit, Some(50.0), [73.0, 6.7, 4.8, 0.3, 0.0, 25.0, 0.8, 73.0, 0.0, 85.0]),
    food("batata cozida", Per100g, Some(100.0), [52.0, 1.2, 0.0, 11.9, 1.3, 4.0, 0.2, 2.0, 3.8, 0.0]),
    food("mandioca cozida", Per100g, Some(100.0), [125.0, 0.6, 0.3, 30.1, 1.6, 19.0, 0.1, 1.0, 11.1, 0.0]),
    food("abobora cabotia cozida", Per100g, Some(80.0), [48.0, 1.4, 0.7, 10.8, 2.5, 8.0, 0.3, 0.0, 5.1, 186.0]),
    food("cenoura cozida", Per100g, Some(50.0), [30.0, 0.8, 0.2, 6.7, 2.6, 26.0, 0.1, 10.0, 0.1, 933.0]),
    food("brocolis cozido", Per100g, Some(50.0), [25.0, 2.1, 0.5, 4.4, 3.4, 51.0, 0.5, 2.0, 42.0, 0.0]),
    food("chuchu cozido", Per100g, Some(50.0), [19.0, 0.4, 0.0, 4.8, 1.0, 8.0, 0.1, 1.0, 0.8, 0.0]),
    food("alface", Per100g, Some(20.0), [11.0, 1.3, 0.2, 1.7, 1.8, 28.0, 0.4, 4.0, 15.6, 0.0]),
    food("tomate", Per100g, Some(50.0), [15.0, 1.1, 0.2, 3.1, 1.2, 7.0, 0.2, 1.0, 21.2, 0.0]),
    food("macarrao cozido", Per100g, Some(100.0), [157.0, 5.8, 0.9, 30.9, 1.8, 7.0, 0.5, 1.0, 0.0, 0.0]),
    food("banana prata", Per100g, Some(70.0), [98.0, 1.3, 0.1, 26.0, 2.0, 8.0, 0.4, 0.0, 21.6, 0.0]),
    food("maca fuji", Per100g, Some(130.0), [56.0, 0.3, 0.0, 15.2, 1.3, 2.0, 0.1, 0.0, 2.4, 0.0]),
    food("mamao papaia", Per100g, Some(150.0), [40.0, 0.5, 0.1, 10.4, 1.0, 22.0, 0.2, 2.0, 82.2, 0.0]),
    food("suco de laranja", Per100ml, Some(200.0), [33.0, 0.7, 0.1, 7.6, 0.0, 7.0, 0.1, 0.0, 73.3, 0.0]),
    food("leite integral", Per100ml, Some(200.0), [61.0, 2.9, 3.2, 4.5, 0.0, 123.0, 0.0, 64.0, 0.0, 36.0]),
    food("formula infantil", Per100ml, Some(150.0), [67.0, 1.4, 3.5, 7.4, 0.0, 50.0, 0.8, 18.0, 8.0, 60.0]),
    food("iogurte natural", Per100g, Some(170.0), [51.0, 4.1, 3.0, 1.9, 0.0, 143.0, 0.0, 52.0, 1.1, 19.0]),
    food("queijo minas frescal", Per100g, Some(30.0), [264.0, 17.4, 20.2, 3.2, 0.0, 579.0, 0.9, 31.0, 0.0, 0.0]),
    food("pao frances", Per100g, Some(50.0), [300.0, 8.0, 3.1, 58.6, 2.3, 16.0, 1.0, 648.0, 0.0, 0.0]),
    food("biscoito maisena", Per100g, Some(5.0), [443.0, 8.1, 12.0, 75.2, 2.1, 54.0, 1.8, 352.0, 0.0, 0.0]),
    food("aveia em flocos", Per100g, Some(15.0), [394.0, 13.9, 8.5, 66.6, 9.1, 48.0, 4.4, 5.0, 0.0, 0.0]),
];

fn to_create(food: &SeedFood) -> NutrientFactCreate {
    let [energy, protein, lipid, carbohydrate, fiber, calcium, iron, sodium, vitamin_c, vitamin_a] = food.values;
    NutrientFactCreate {
        name: food.name.to_string(),
        basis: food.basis,
        portion_grams: food.portion_grams,
        nutrition: NutritionTotals {
            energy,
            protein,
            lipid,
            carbohydrate,
            fiber,
            calcium,
            iron,
            sodium,
            vitamin_c,
            vitamin_a,
        },
        notes: Some("TACO".to_string()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    config.ensure_dirs()?;
    println!("Database path: {}", config.database_path.display());

    let database = Database::new(&config.database_path)?;

    database.with_conn(|conn| {
        db::run_migrations(conn)?;
        Ok(())
    })?;

    let seeded = database.with_transaction(|tx| {
        let mut count = 0;
        for food in FOODS {
            let fact = NutrientFact::upsert(tx, &to_create(food))?;
            println!("  {:>4}  {}", fact.id, fact.name);
            count += 1;
        }
        Ok(count)
    })?;

    println!("Seeded {} nutrient facts", seeded);

    Ok(())
}
