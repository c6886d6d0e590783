use toml;

pub fn family_toml() -> toml::Table {
    toml::toml! {
        name = "modis"

        description = "MODIS Terra and Aqua land products on the sinusoidal grid. Tile ids are the\n\
        horizontal and vertical grid indices (hHHvVV)."

        root = "/data/modis/tiles"

        extension = "tif"

        tile_width = 6

        [tiles]
        vector = "/data/modis/modis_sinusoidal_grid.geojson"
        attribute = "tile"

        [[sensors]]
        code = "MOD"
        name = "Terra"
        raw = "^MOD[0-9A-Z]+\\.A(?<date>[0-9]{7})\\.(?<tile>h[0-9]{2}v[0-9]{2})\\..*\\.hdf$"

        [[sensors]]
        code = "MYD"
        name = "Aqua"
        raw = "^MYD[0-9A-Z]+\\.A(?<date>[0-9]{7})\\.(?<tile>h[0-9]{2}v[0-9]{2})\\..*\\.hdf$"

        [[products]]
        id = "temp"
        description = "Land surface temperature"

        [[products]]
        id = "ndvi"
        description = "Normalized Difference Vegetation Index"

        [[products]]
        id = "landcover"
        description = "Land cover type"

        [[products]]
        id = "snow"
        description = "Snow cover fraction"
    }
}
