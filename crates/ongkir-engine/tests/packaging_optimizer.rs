use ongkir_engine::shipping::{
    optimize_packaging, volumetric_weight_gram, BoxPreset, CartLine, Dimensions,
    VolumetricDivisors,
};

fn divisors() -> VolumetricDivisors {
    VolumetricDivisors::from([("jne".to_string(), 6000), ("anteraja".to_string(), 4000)])
}

#[test]
fn two_units_share_one_box() {
    let items = vec![CartLine::new(1, 2, 1000).with_dimensions(20, 10, 10)];
    let presets = vec![BoxPreset::new("box", "Box", Dimensions::new(30, 20, 20), 5000)];

    let result = optimize_packaging(&items, &presets, &divisors(), Dimensions::default());

    assert_eq!(result.packages.len(), 1);
    let package = &result.packages[0];
    assert_eq!(package.actual_weight_gram, 2000);
    assert_eq!(package.used_volume_cm3, 4000);
    assert_eq!(package.volumetric_weight_gram_by_courier["jne"], 667);
    assert_eq!(package.volumetric_weight_gram_by_courier["anteraja"], 1000);
    assert_eq!(result.chargeable_total_by_courier["jne"], 2000);
    assert_eq!(result.chargeable_total_by_courier["anteraja"], 2000);
    assert!(!result.dimension_fallback_used);
}

#[test]
fn packages_conserve_mass_and_respect_capacity() {
    let items = vec![
        CartLine::new(1, 5, 1800).with_dimensions(25, 20, 10),
        CartLine::new(2, 3, 400),
        CartLine::new(3, 2, 6000).with_dimensions(40, 30, 30),
    ];
    let presets = BoxPreset::builtin();

    let result = optimize_packaging(&items, &presets, &divisors(), Dimensions::default());

    let expected: u64 = items.iter().map(CartLine::line_weight_gram).sum();
    assert_eq!(result.actual_weight_gram(), expected);

    let units: u32 = result
        .packages
        .iter()
        .flat_map(|package| package.items.iter())
        .map(|item| item.quantity)
        .sum();
    assert_eq!(units, 10);

    for package in &result.packages {
        assert!(package.actual_weight_gram <= package.container.max_weight_gram);
        assert!(package.used_volume_cm3 <= package.container.volume_cm3);
    }
    assert!(result.dimension_fallback_used);
}

#[test]
fn oversized_unit_gets_a_custom_box() {
    let items = vec![CartLine::new(9, 1, 2500).with_dimensions(120, 60, 40)];
    let presets = vec![BoxPreset::new("small", "Small", Dimensions::new(20, 15, 10), 3000)];

    let result = optimize_packaging(&items, &presets, &divisors(), Dimensions::default());

    assert_eq!(result.packages.len(), 1);
    assert_eq!(result.packages[0].container.id, "custom-9");
    assert_eq!(result.packages[0].container.volume_cm3, 120 * 60 * 40);
}

#[test]
fn empty_divisors_fall_back_to_default_key() {
    let items = vec![CartLine::new(1, 1, 100).with_dimensions(30, 20, 10)];
    let result = optimize_packaging(
        &items,
        &BoxPreset::builtin(),
        &VolumetricDivisors::new(),
        Dimensions::default(),
    );

    assert_eq!(result.chargeable_total_by_courier.len(), 1);
    assert_eq!(result.chargeable_total_for("sicepat"), Some(1000));
}

#[test]
fn volumetric_weight_never_grows_with_divisor() {
    let volume = 13_579;
    let mut previous = u64::MAX;
    for divisor in [1, 500, 2500, 4000, 5000, 6000, 7500, 12_000] {
        let weight = volumetric_weight_gram(volume, divisor);
        assert!(weight <= previous, "divisor {divisor}");
        previous = weight;
    }
}
